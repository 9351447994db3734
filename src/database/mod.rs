use mongodb::Collection;

use crate::campaign::db::CampaignStore;
use crate::campaign::Campaign;
use crate::error::Error;
use crate::recipient::db::RecipientStore;
use crate::recipient::Recipient;

mod memory;

pub use memory::MemoryDatabase;

pub type MongoCampaignStore = Collection<Campaign>;
pub type MongoRecipientStore = Collection<Recipient>;

pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;

    fn recipients(&self) -> &dyn RecipientStore;
}

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    campaigns: Collection<Campaign>,
    recipients: Collection<Recipient>,
}

impl MongoDatabase {
    pub fn new(db: mongodb::Database) -> MongoDatabase {
        MongoDatabase {
            campaigns: db.collection("campaigns"),
            recipients: db.collection("recipients"),
        }
    }

    pub async fn initialize(db: mongodb::Database) -> Result<MongoDatabase, Error> {
        crate::campaign::db::initialize(&db).await?;
        crate::recipient::db::initialize(&db).await?;

        Ok(MongoDatabase::new(db))
    }
}

impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }

    fn recipients(&self) -> &dyn RecipientStore {
        &self.recipients
    }
}
