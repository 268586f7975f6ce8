use primitives::test_util::{discard_logger, DUMMY_CAMPAIGN, DUMMY_PLACEMENT, FREE_TIER, PRO_TIER};

use crate::{application::Config, db::memory::MemoryStore, Application};

/// An [`Application`] over a [`MemoryStore`] with the default configuration
/// and a discarding logger.
pub fn test_application(store: MemoryStore) -> Application<MemoryStore> {
    Application::new(store, Config::default(), discard_logger())
}

/// A [`MemoryStore`] preloaded with the dummy campaign, its placement and a
/// free/pro account each.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_campaign(DUMMY_CAMPAIGN.clone());
    store.insert_placement(DUMMY_PLACEMENT.clone());
    store.insert_account("free-user", FREE_TIER.clone());
    store.insert_account("pro-user", PRO_TIER.clone());

    store
}
