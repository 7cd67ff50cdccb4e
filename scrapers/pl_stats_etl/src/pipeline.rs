use async_trait::async_trait;
use tracing::{error, info};

use crate::{collector::Collector, datasets::DatasetRule, error::Result, types::Dataset};

/// A destination that receives every collected dataset.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;
    async fn publish(&self, dataset: &Dataset) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub datasets: Vec<(String, usize)>,
    pub publishers: Vec<&'static str>,
}

pub struct Pipeline {
    collector: Collector,
    publishers: Vec<Box<dyn Publisher>>,
}

impl Pipeline {
    pub fn new(collector: Collector) -> Self {
        Self {
            collector,
            publishers: Vec::new(),
        }
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    /// Collects every dataset, then hands each one to each publisher in turn.
    /// The first error aborts the run.
    pub async fn run(&self, rules: &[DatasetRule]) -> Result<RunSummary> {
        info!("Collecting {} dataset(s)", rules.len());
        let datasets = self.collector.collect_all(rules).await.map_err(|e| {
            error!("Collection failed: {}", e);
            e
        })?;

        for publisher in &self.publishers {
            for dataset in &datasets {
                info!("Publishing {} via {}", dataset.name, publisher.name());
                publisher.publish(dataset).await.map_err(|e| {
                    error!("{} failed for {}: {}", publisher.name(), dataset.name, e);
                    e
                })?;
            }
        }

        let summary = RunSummary {
            datasets: datasets.iter().map(|d| (d.name.clone(), d.len())).collect(),
            publishers: self.publishers.iter().map(|p| p.name()).collect(),
        };
        info!(
            "Run complete: {} dataset(s) published via {:?}",
            summary.datasets.len(),
            summary.publishers
        );
        Ok(summary)
    }
}
