use checkout_engine::{
    processor_types::{NewProcessorPrice, NewProcessorSession, ProcessorLineItem, ProcessorPrice, ProcessorSession},
    traits::{PaymentProcessor, ProcessorError, RateSource, RateSourceError},
    RateTable,
};
use mockall::mock;
use storefront_common::CurrencyCode;

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn create_price(&self, price: &NewProcessorPrice) -> Result<ProcessorPrice, ProcessorError>;
        async fn create_checkout_session(&self, session: &NewProcessorSession) -> Result<ProcessorSession, ProcessorError>;
        async fn list_session_line_items(&self, session_id: &str) -> Result<Vec<ProcessorLineItem>, ProcessorError>;
    }
}

mock! {
    pub RateFeed {}
    impl RateSource for RateFeed {
        async fn fetch_rates(&self, base: &CurrencyCode) -> Result<RateTable, RateSourceError>;
    }
}
