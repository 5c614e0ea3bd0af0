use std::sync::Arc;

use anyhow::Result;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::info;

use crate::config::Config;
use crate::gateways::{HttpPaymentProvider, LogNotifier, NoopEmailSender};
use crate::handlers::Handler;
use crate::ratelimit::RateLimiter;
use crate::repositories::mongo::{
    MongoBookingRepository, MongoConversationRepository, MongoHelpfulMarkRepository,
    MongoMessageRepository, MongoOrderRepository, MongoProductRepository, MongoQuestionRepository,
    MongoReviewRepository, MongoVendorRepository,
};

pub struct AppState {
    pub handler: Handler,
    pub limiter: RateLimiter,
    pub config: Config,
}

impl AppState {
    pub async fn initialize(config: Config) -> Result<Arc<Self>> {
        let options = ClientOptions::parse(&config.mongodb_uri).await?;
        let client = Client::with_options(options)?;
        let db = client.database(&config.mongodb_db);
        info!("connected to database {}", config.mongodb_db);

        let handler = Handler {
            products: Arc::new(MongoProductRepository::new_with(&db).await?),
            orders: Arc::new(MongoOrderRepository::new_with(&db).await?),
            conversations: Arc::new(MongoConversationRepository::new_with(&db).await?),
            messages: Arc::new(MongoMessageRepository::new_with(client.clone(), &db).await?),
            reviews: Arc::new(MongoReviewRepository::new_with(&db).await?),
            bookings: Arc::new(MongoBookingRepository::new_with(&db).await?),
            questions: Arc::new(MongoQuestionRepository::new_with(&db).await?),
            marks: Arc::new(MongoHelpfulMarkRepository::new_with(&db).await?),
            vendors: Arc::new(MongoVendorRepository::new_with(&db).await?),
            payments: Arc::new(HttpPaymentProvider::new(
                config.payment_api_base.clone(),
                config.payment_secret_key.clone(),
                config.public_base_url.clone(),
            )),
            notifier: Arc::new(LogNotifier),
            email: Arc::new(NoopEmailSender),
        };

        Ok(Arc::new(Self {
            handler,
            limiter: RateLimiter::with_defaults(),
            config,
        }))
    }
}
