//! The extract → reconcile → upsert pipeline

use crate::core::error::{FetchError, PipelineError, ReconcileError};
use crate::core::reconcile::{self, PairingMode};
use crate::core::{
    DailyRecord, GoldObservation, GoldPriceSource, RateObservation, RateSource, RecordSink,
};
use crate::scheduler::TaskRunner;
use std::sync::Arc;
use tracing::{info, instrument};

pub const DEFAULT_PRODUCT_TYPE: &str = "antam";

pub struct Pipeline {
    rate_source: Arc<dyn RateSource>,
    gold_source: Arc<dyn GoldPriceSource>,
    sink: Arc<dyn RecordSink>,
    product_type: String,
    pairing: PairingMode,
}

impl Pipeline {
    pub fn new(
        rate_source: Arc<dyn RateSource>,
        gold_source: Arc<dyn GoldPriceSource>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Pipeline {
            rate_source,
            gold_source,
            sink,
            product_type: DEFAULT_PRODUCT_TYPE.to_string(),
            pairing: PairingMode::default(),
        }
    }

    pub fn with_product_type(mut self, product_type: &str) -> Self {
        self.product_type = product_type.to_string();
        self
    }

    pub fn with_pairing(mut self, pairing: PairingMode) -> Self {
        self.pairing = pairing;
        self
    }

    pub async fn extract_rate(&self) -> Result<RateObservation, FetchError> {
        self.rate_source.fetch_rate().await
    }

    pub async fn extract_gold(&self) -> Result<GoldObservation, FetchError> {
        self.gold_source.fetch_gold(&self.product_type).await
    }

    pub fn transform(
        &self,
        rate: &RateObservation,
        gold: &GoldObservation,
    ) -> Result<DailyRecord, ReconcileError> {
        reconcile::reconcile(rate, gold, self.pairing)
    }

    /// Upserts on the blocking pool; the sink's connection is gone when this returns.
    pub async fn load(&self, record: DailyRecord) -> Result<(), PipelineError> {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.upsert(&record))
            .await
            .map_err(|e| PipelineError::Aborted(format!("load: {e}")))??;
        Ok(())
    }

    /// Runs every step once through `runner`, which owns the retry policy.
    ///
    /// Both extractions run concurrently. Nothing is written unless every
    /// earlier step succeeded.
    #[instrument(name = "PipelineRun", skip_all, fields(product_type = %self.product_type))]
    pub async fn run(&self, runner: &TaskRunner) -> Result<DailyRecord, PipelineError> {
        let (rate, gold) = futures::try_join!(
            runner.run("extract_rate", || self.extract_rate()),
            runner.run("extract_gold", || self.extract_gold()),
        )?;

        let record = runner
            .run("transform", || async { self.transform(&rate, &gold) })
            .await?;

        runner.run("load", || self.load(record)).await?;

        info!(
            date = %record.date,
            rate = record.rate,
            gold_sell_price = record.gold_sell_price,
            "Daily record stored"
        );
        Ok(record)
    }
}
