use chrono::NaiveDate;
use regex::Regex;

use crate::{
    config::SourceConfig,
    error::{EtlError, Result},
    html_table::{extract_table, RawTable},
    types::{Column, ColumnType, Dataset, Value},
};

const WF_TABLE: &str = "table.standard_tabelle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Bbc,
    WorldFootball,
}

impl Site {
    pub fn base_url<'a>(&self, sources: &'a SourceConfig) -> &'a str {
        match self {
            Site::Bbc => &sources.bbc_base_url,
            Site::WorldFootball => &sources.worldfootball_base_url,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum HeaderMatch {
    /// Normalized header equals one of the labels
    Any(&'static [&'static str]),
    /// Normalized header contains one of the labels
    Containing(&'static [&'static str]),
}

impl HeaderMatch {
    fn locate(&self, table: &RawTable) -> Option<usize> {
        match self {
            HeaderMatch::Any(labels) => table.find_header(|h| labels.iter().any(|l| *l == h)),
            HeaderMatch::Containing(labels) => {
                table.find_header(|h| labels.iter().any(|l| h.contains(*l)))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub name: &'static str,
    pub ty: ColumnType,
    pub header: HeaderMatch,
    pub capture: Option<&'static str>,
    pub optional: bool,
    pub nullable: bool,
    pub fill_down: bool,
}

impl ColumnRule {
    fn new(name: &'static str, ty: ColumnType, labels: &'static [&'static str]) -> Self {
        Self {
            name,
            ty,
            header: HeaderMatch::Any(labels),
            capture: None,
            optional: false,
            nullable: false,
            fill_down: false,
        }
    }

    pub fn text(name: &'static str, labels: &'static [&'static str]) -> Self {
        Self::new(name, ColumnType::Text, labels)
    }

    pub fn integer(name: &'static str, labels: &'static [&'static str]) -> Self {
        Self::new(name, ColumnType::Integer, labels)
    }

    pub fn date(name: &'static str, labels: &'static [&'static str]) -> Self {
        Self::new(name, ColumnType::Date, labels)
    }

    pub fn float(name: &'static str, labels: &'static [&'static str]) -> Self {
        Self::new(name, ColumnType::Float, labels)
    }

    pub fn containing(mut self, labels: &'static [&'static str]) -> Self {
        self.header = HeaderMatch::Containing(labels);
        self
    }

    /// Keep only the first capture group of `pattern` from the cell text
    pub fn capture(mut self, pattern: &'static str) -> Self {
        self.capture = Some(pattern);
        self
    }

    /// Header may be missing (column becomes all-null) and cells may be empty
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.nullable = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn fill_down(mut self) -> Self {
        self.fill_down = true;
        self
    }
}

#[derive(Debug, Clone)]
pub enum PagePath {
    Single(&'static str),
    /// `{page}` in the template is replaced by each page number
    Numbered {
        template: &'static str,
        pages: std::ops::RangeInclusive<u32>,
    },
}

/// Fixed selectors and column mappings for one scraped dataset.
#[derive(Debug, Clone)]
pub struct DatasetRule {
    pub name: &'static str,
    pub site: Site,
    pub path: PagePath,
    pub table_selector: &'static str,
    pub header_override: Option<&'static [&'static str]>,
    pub columns: Vec<ColumnRule>,
    pub skip_total_row: bool,
}

impl DatasetRule {
    pub fn urls(&self, sources: &SourceConfig) -> Vec<String> {
        let base = self.site.base_url(sources).trim_end_matches('/');
        match &self.path {
            PagePath::Single(path) => vec![format!("{}{}", base, path)],
            PagePath::Numbered { template, pages } => pages
                .clone()
                .map(|page| format!("{}{}", base, template.replace("{page}", &page.to_string())))
                .collect(),
        }
    }

    pub fn schema(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|c| Column::new(c.name, c.ty))
            .collect()
    }

    /// Parses every fetched page and concatenates the rows into one dataset.
    pub fn parse_pages<S: AsRef<str>>(&self, pages: &[S]) -> Result<Dataset> {
        let mut dataset = Dataset::new(self.name, self.schema());
        for html in pages {
            let table = extract_table(
                html.as_ref(),
                self.table_selector,
                self.header_override,
                self.name,
            )?;
            self.append_table(&mut dataset, &table)?;
        }

        if dataset.is_empty() {
            return Err(EtlError::parse(self.name, "table has no data rows"));
        }
        Ok(dataset)
    }

    pub fn parse(&self, html: &str) -> Result<Dataset> {
        self.parse_pages(&[html])
    }

    fn append_table(&self, dataset: &mut Dataset, table: &RawTable) -> Result<()> {
        let mut positions = Vec::with_capacity(self.columns.len());
        let mut patterns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let position = column.header.locate(table);
            if position.is_none() && !column.optional {
                return Err(EtlError::parse(
                    self.name,
                    format!(
                        "column '{}' not found in headers {:?}",
                        column.name, table.headers
                    ),
                ));
            }
            positions.push(position);
            patterns.push(
                column
                    .capture
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| EtlError::parse(self.name, e.to_string()))?,
            );
        }

        let mut rows: &[Vec<String>] = &table.rows;
        if self.skip_total_row {
            if let Some((last, rest)) = rows.split_last() {
                if last.iter().any(|cell| cell.to_lowercase().contains("total")) {
                    rows = rest;
                }
            }
        }

        let mut previous: Vec<Option<String>> = vec![None; self.columns.len()];
        for (row_number, row) in rows.iter().enumerate() {
            let mut cells: Vec<String> = positions
                .iter()
                .zip(&patterns)
                .map(|(position, pattern)| {
                    let raw = position.map(|i| row[i].as_str()).unwrap_or("");
                    match pattern {
                        Some(re) => re
                            .captures(raw)
                            .and_then(|caps| caps.get(1))
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default(),
                        None => raw.to_string(),
                    }
                })
                .collect();

            // Spacer rows
            if cells.iter().all(String::is_empty) {
                continue;
            }

            for (i, column) in self.columns.iter().enumerate() {
                if column.fill_down {
                    if cells[i].is_empty() {
                        if let Some(prev) = &previous[i] {
                            cells[i] = prev.clone();
                        }
                    } else {
                        previous[i] = Some(cells[i].clone());
                    }
                }
            }

            let values = self
                .columns
                .iter()
                .zip(&cells)
                .map(|(column, cell)| self.coerce(column, cell, row_number))
                .collect::<Result<Vec<_>>>()?;
            dataset.push_row(values)?;
        }
        Ok(())
    }

    fn coerce(&self, column: &ColumnRule, cell: &str, row_number: usize) -> Result<Value> {
        if cell.is_empty() {
            return if column.nullable {
                Ok(Value::Null)
            } else {
                Err(EtlError::parse(
                    self.name,
                    format!("row {}: column '{}' is empty", row_number, column.name),
                ))
            };
        }

        let value = match column.ty {
            ColumnType::Text => Some(Value::Text(cell.to_string())),
            ColumnType::Integer => parse_integer(cell).map(Value::Integer),
            ColumnType::Date => parse_date(cell).map(Value::Date),
            ColumnType::Float => parse_float(cell).map(Value::Float),
        };
        value.ok_or_else(|| {
            EtlError::parse(
                self.name,
                format!(
                    "row {}: column '{}' cannot read '{}' as {}",
                    row_number, column.name, cell, column.ty
                ),
            )
        })
    }
}

pub fn parse_integer(cell: &str) -> Option<i64> {
    let cleaned: String = cell
        .trim()
        .replace('\u{2212}', "-")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<i64>().ok()
}

pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    ["%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cell.trim(), fmt).ok())
}

pub fn parse_float(cell: &str) -> Option<f64> {
    cell.trim().replace(',', ".").parse::<f64>().ok()
}

pub fn league_table() -> DatasetRule {
    DatasetRule {
        name: "league_table",
        site: Site::Bbc,
        path: PagePath::Single("/sport/football/premier-league/table"),
        table_selector: "table",
        header_override: None,
        columns: vec![
            ColumnRule::integer("position", &["position", "pos", "#"]),
            ColumnRule::text("team", &["team", "club"]),
            ColumnRule::integer("played", &["played", "p", "pl"]),
            ColumnRule::integer("won", &["won", "w"]),
            ColumnRule::integer("drawn", &["drawn", "d"]),
            ColumnRule::integer("lost", &["lost", "l"]),
            ColumnRule::integer("goals_for", &["goals for", "for", "f", "gf"]),
            ColumnRule::integer("goals_against", &["goals against", "against", "a", "ga"]),
            ColumnRule::integer("goal_difference", &["goal difference", "gd"]),
            ColumnRule::integer("points", &["points", "pts"]),
        ],
        skip_total_row: false,
    }
}

pub fn top_scorers() -> DatasetRule {
    DatasetRule {
        name: "top_scorers",
        site: Site::Bbc,
        path: PagePath::Single("/sport/football/premier-league/top-scorers"),
        table_selector: "table",
        header_override: None,
        columns: vec![
            ColumnRule::text("player", &["player", "name"]),
            ColumnRule::text("team", &["team", "club"]).nullable(),
            ColumnRule::integer("goals", &["goals", "g"]),
            ColumnRule::integer("assists", &["assists", "a"]).optional(),
            ColumnRule::integer("played", &["played", "apps", "matches"]).optional(),
        ],
        skip_total_row: false,
    }
}

pub fn detail_top() -> DatasetRule {
    DatasetRule {
        name: "detail_top",
        site: Site::WorldFootball,
        path: PagePath::Single("/goalgetter/eng-premier-league-2024-2025/"),
        table_selector: WF_TABLE,
        header_override: None,
        columns: vec![
            ColumnRule::text("player", &["player"]),
            ColumnRule::text("team", &["team"]),
            ColumnRule::integer("goals", &["goals (penalty)", "goals"]).capture(r"^(\d+)"),
            ColumnRule::integer("penalty", &["goals (penalty)"])
                .capture(r"\((\d+)\)")
                .optional(),
        ],
        skip_total_row: false,
    }
}

pub fn player_table() -> DatasetRule {
    DatasetRule {
        name: "player_table",
        site: Site::WorldFootball,
        path: PagePath::Numbered {
            template: "/players_list/eng-premier-league-2023-2024/nach-name/{page}",
            pages: 1..=11,
        },
        table_selector: WF_TABLE,
        header_override: None,
        columns: vec![
            ColumnRule::text("player", &["player"]),
            ColumnRule::text("team", &["team"]).nullable(),
            ColumnRule::date("born", &["born"]).optional(),
            ColumnRule::text("height", &["height"]).optional(),
            ColumnRule::text("position", &["position"]).optional(),
        ],
        skip_total_row: false,
    }
}

pub fn all_time_table() -> DatasetRule {
    DatasetRule {
        name: "all_time_table",
        site: Site::WorldFootball,
        path: PagePath::Single("/alltime_table/eng-premier-league/pl-only/"),
        table_selector: WF_TABLE,
        header_override: Some(&[
            "pos", "#", "Team", "Matches", "Wins", "Draws", "Losses", "Goals", "Dif", "Points",
        ]),
        columns: vec![
            ColumnRule::integer("pos", &["pos"]),
            ColumnRule::text("team", &["team"]),
            ColumnRule::integer("matches", &["matches"]),
            ColumnRule::integer("wins", &["wins"]),
            ColumnRule::integer("draws", &["draws"]),
            ColumnRule::integer("losses", &["losses"]),
            ColumnRule::integer("goals_for", &["goals"]).capture(r"^(\d+)\s*:"),
            ColumnRule::integer("goals_against", &["goals"]).capture(r":\s*(\d+)$"),
            ColumnRule::integer("goal_difference", &["dif"]),
            ColumnRule::integer("points", &["points"]),
        ],
        skip_total_row: false,
    }
}

pub fn all_time_winner_club() -> DatasetRule {
    DatasetRule {
        name: "all_time_winner_club",
        site: Site::WorldFootball,
        path: PagePath::Single("/winner/eng-premier-league/"),
        table_selector: WF_TABLE,
        header_override: None,
        columns: vec![
            ColumnRule::text("year", &["year", "season"]),
            ColumnRule::text("winner", &["winner", "team", "champion"]),
        ],
        skip_total_row: false,
    }
}

pub fn top_scorers_seasons() -> DatasetRule {
    DatasetRule {
        name: "top_scorers_seasons",
        site: Site::WorldFootball,
        path: PagePath::Single("/top_scorer/eng-premier-league/"),
        table_selector: WF_TABLE,
        header_override: Some(&["Season", "#", "Top scorer", "#", "Team", "Goals"]),
        columns: vec![
            ColumnRule::text("season", &["season"]).fill_down(),
            ColumnRule::text("top_scorer", &["top scorer"]),
            ColumnRule::text("team", &["team"]),
            ColumnRule::integer("goals", &["goals"]),
        ],
        skip_total_row: false,
    }
}

pub fn goals_per_season() -> DatasetRule {
    DatasetRule {
        name: "goals_per_season",
        site: Site::WorldFootball,
        path: PagePath::Single("/stats/eng-premier-league/1/"),
        table_selector: WF_TABLE,
        header_override: None,
        columns: vec![
            ColumnRule::text("season", &["season", "year"]),
            ColumnRule::integer("matches", &["matches"]).optional(),
            ColumnRule::integer("goals", &["goals"]),
            ColumnRule::float("average_goals", &[]).containing(&["ø", "average"]).optional(),
        ],
        skip_total_row: true,
    }
}

/// Every dataset the pipeline produces, in load order.
pub fn all_rules() -> Vec<DatasetRule> {
    vec![
        league_table(),
        top_scorers(),
        detail_top(),
        player_table(),
        all_time_table(),
        all_time_winner_club(),
        top_scorers_seasons(),
        goals_per_season(),
    ]
}

/// Rules whose names appear in `names`, or all of them when `names` is empty.
pub fn select_rules(names: &[String]) -> Result<Vec<DatasetRule>> {
    let rules = all_rules();
    if names.is_empty() {
        return Ok(rules);
    }
    names
        .iter()
        .map(|name| {
            rules
                .iter()
                .find(|r| r.name == name.as_str())
                .cloned()
                .ok_or_else(|| EtlError::Config(format!("Unknown dataset '{}'", name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("12"), Some(12));
        assert_eq!(parse_integer("+7"), Some(7));
        assert_eq!(parse_integer("\u{2212}4"), Some(-4));
        assert_eq!(parse_integer("1,234"), Some(1234));
        assert_eq!(parse_integer("abc"), None);
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(1995, 3, 8);
        assert_eq!(parse_date("08/03/1995"), expected);
        assert_eq!(parse_date("08.03.1995"), expected);
        assert_eq!(parse_date("1995-03-08"), expected);
        assert_eq!(parse_date("March 8"), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("2,68"), Some(2.68));
        assert_eq!(parse_float("2.68"), Some(2.68));
    }

    #[test]
    fn test_urls() {
        let sources = SourceConfig::single("http://localhost:8080/");
        assert_eq!(
            league_table().urls(&sources),
            vec!["http://localhost:8080/sport/football/premier-league/table"]
        );

        let pages = player_table().urls(&SourceConfig::default());
        assert_eq!(pages.len(), 11);
        assert_eq!(
            pages[10],
            "https://www.worldfootball.net/players_list/eng-premier-league-2023-2024/nach-name/11"
        );
    }

    #[test]
    fn test_detail_top_splits_goals_and_penalties() {
        let html = r#"<table class="standard_tabelle">
            <tr><th>#</th><th>Player</th><th></th><th>Team</th><th>Goals (Penalty)</th></tr>
            <tr><td>1.</td><td>Mohamed Salah</td><td></td><td>Liverpool FC</td><td>29 (9)</td></tr>
            <tr><td>2.</td><td>Alexander Isak</td><td></td><td>Newcastle United</td><td>23</td></tr>
        </table>"#;

        let dataset = detail_top().parse(html).unwrap();
        assert_eq!(dataset.column_names(), vec!["player", "team", "goals", "penalty"]);
        assert_eq!(
            dataset.rows()[0],
            vec![
                Value::Text("Mohamed Salah".into()),
                Value::Text("Liverpool FC".into()),
                Value::Integer(29),
                Value::Integer(9),
            ]
        );
        assert_eq!(dataset.rows()[1][3], Value::Null);
    }

    #[test]
    fn test_top_scorers_seasons_fills_season_down() {
        let html = r#"<table class="standard_tabelle">
            <tr><th>Season</th><th>#</th><th>Top scorer</th><th>#</th><th>Team</th><th>Goals</th></tr>
            <tr><td>2018/2019</td><td></td><td>Pierre-Emerick Aubameyang</td><td></td><td>Arsenal FC</td><td>22</td></tr>
            <tr><td></td><td></td><td>Sadio Mané</td><td></td><td>Liverpool FC</td><td>22</td></tr>
            <tr><td>2019/2020</td><td></td><td>Jamie Vardy</td><td></td><td>Leicester City</td><td>23</td></tr>
        </table>"#;

        let dataset = top_scorers_seasons().parse(html).unwrap();
        let seasons: Vec<String> = dataset.rows().iter().map(|r| r[0].to_string()).collect();
        assert_eq!(seasons, vec!["2018/2019", "2018/2019", "2019/2020"]);
    }

    #[test]
    fn test_goals_per_season_drops_total_row() {
        let html = r#"<table class="standard_tabelle">
            <tr><th>#</th><th>Season</th><th>Matches</th><th>Goals</th><th>Ø goals</th></tr>
            <tr><td>1</td><td>2022/2023</td><td>380</td><td>1084</td><td>2,85</td></tr>
            <tr><td>2</td><td>2023/2024</td><td>380</td><td>1246</td><td>3,28</td></tr>
            <tr><td></td><td>Total</td><td>760</td><td>2330</td><td>3,07</td></tr>
        </table>"#;

        let dataset = goals_per_season().parse(html).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[1][3], Value::Float(3.28));
    }

    #[test]
    fn test_goals_per_season_reads_average_header() {
        let html = r#"<table class="standard_tabelle">
            <tr><th>#</th><th>Season</th><th>Matches</th><th>Goals</th><th>Average goals</th></tr>
            <tr><td>1</td><td>2022/2023</td><td>380</td><td>1084</td><td>2,85</td></tr>
        </table>"#;

        let dataset = goals_per_season().parse(html).unwrap();
        assert_eq!(dataset.rows()[0][3], Value::Float(2.85));
    }

    #[test]
    fn test_all_time_table_splits_goal_tally() {
        let html = r#"<table class="standard_tabelle">
            <tr><th>#</th><th></th><th>Team</th><th>M.</th><th>W</th><th>D</th><th>L</th><th>goals</th><th>Dif.</th><th>Pt.</th></tr>
            <tr><td>1</td><td></td><td>Manchester United</td><td>1254</td><td>736</td><td>283</td><td>235</td><td>2332:1190</td><td>1142</td><td>2491</td></tr>
        </table>"#;

        let dataset = all_time_table().parse(html).unwrap();
        let row = &dataset.rows()[0];
        assert_eq!(row[1], Value::Text("Manchester United".into()));
        assert_eq!(row[6], Value::Integer(2332));
        assert_eq!(row[7], Value::Integer(1190));
        assert_eq!(row[9], Value::Integer(2491));
    }

    #[test]
    fn test_missing_required_column_is_parse_error() {
        let html = r#"<table class="standard_tabelle">
            <tr><th>Player</th><th>Goals</th></tr>
            <tr><td>Mohamed Salah</td><td>29</td></tr>
        </table>"#;

        let err = detail_top().parse(html).unwrap_err();
        assert!(matches!(err, EtlError::Parse { .. }));
    }

    #[test]
    fn test_bad_integer_is_parse_error() {
        let html = r#"<table class="standard_tabelle">
            <tr><th>Season</th><th>Winner</th></tr>
            <tr><td>2023/2024</td><td>Manchester City</td></tr>
        </table>"#;
        assert!(all_time_winner_club().parse(html).is_ok());

        let html = r#"<table class="standard_tabelle">
            <tr><th>Season</th><th>Goals</th></tr>
            <tr><td>2023/2024</td><td>lots</td></tr>
        </table>"#;
        let err = goals_per_season().parse(html).unwrap_err();
        assert!(matches!(err, EtlError::Parse { .. }));
    }

    #[test]
    fn test_header_only_table_is_parse_error() {
        let html = r#"<table class="standard_tabelle"><tr><th>Season</th><th>Winner</th></tr></table>"#;
        let err = all_time_winner_club().parse(html).unwrap_err();
        assert!(matches!(err, EtlError::Parse { .. }));
    }

    #[test]
    fn test_select_rules() {
        assert_eq!(select_rules(&[]).unwrap().len(), 8);
        let picked = select_rules(&["goals_per_season".to_string()]).unwrap();
        assert_eq!(picked[0].name, "goals_per_season");
        assert!(select_rules(&["fixtures".to_string()]).is_err());
    }
}
