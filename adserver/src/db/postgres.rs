use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use num_traits::CheckedAdd;
use once_cell::sync::Lazy;
use tokio_postgres::{types::Json, IsolationLevel, NoTls};

use primitives::{
    Campaign, CampaignId, EventSubmission, ImpressionEvent, Placement, Position, Status, Tier,
    UnifiedNum,
};

use super::{AdStore, Error, SkipReason, Submission, SummaryRow};

pub type DbPool = deadpool_postgres::Pool;

pub static POSTGRES_USER: Lazy<String> =
    Lazy::new(|| env::var("POSTGRES_USER").unwrap_or_else(|_| String::from("postgres")));

pub static POSTGRES_PASSWORD: Lazy<String> =
    Lazy::new(|| env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| String::from("postgres")));

pub static POSTGRES_HOST: Lazy<String> =
    Lazy::new(|| env::var("POSTGRES_HOST").unwrap_or_else(|_| String::from("localhost")));

pub static POSTGRES_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("POSTGRES_PORT")
        .unwrap_or_else(|_| String::from("5432"))
        .parse()
        .expect("Invalid POSTGRES_PORT")
});

pub static POSTGRES_DB: Lazy<String> =
    Lazy::new(|| env::var("POSTGRES_DB").unwrap_or_else(|_| String::from("adserver")));

/// The default `tokio_postgres` configuration, created from the
/// `POSTGRES_*` environment variables.
pub static POSTGRES_CONFIG: Lazy<tokio_postgres::Config> = Lazy::new(|| {
    let mut config = tokio_postgres::Config::new();

    config
        .user(POSTGRES_USER.as_str())
        .password(POSTGRES_PASSWORD.as_str())
        .host(POSTGRES_HOST.as_str())
        .port(*POSTGRES_PORT)
        .dbname(POSTGRES_DB.as_str());

    config
});

static SELECT_CAMPAIGN: &str = "SELECT id, advertiser_name, advertiser_logo, status, budget, spent, daily_budget, cpm_rate, cpc_rate, priority, target_modules, created, active_from, active_to FROM campaigns WHERE id = $1";

pub async fn postgres_connection(
    full_config: tokio_postgres::Config,
) -> Result<DbPool, deadpool_postgres::BuildError> {
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Verified,
    };
    let manager = Manager::from_config(full_config, NoTls, mgr_config);

    Pool::builder(manager).max_size(42).build()
}

pub async fn migrations() {
    use migrant_lib::{Config, Direction, Migrator, Settings};

    let settings = Settings::configure_postgres()
        .database_user(POSTGRES_USER.as_str())
        .database_password(POSTGRES_PASSWORD.as_str())
        .database_host(POSTGRES_HOST.as_str())
        .database_port(*POSTGRES_PORT)
        .database_name(POSTGRES_DB.as_str())
        .build()
        .expect("Should build migration settings");

    let mut config = Config::with_settings(&settings);
    config.use_cli_compatible_tags(true);

    macro_rules! make_migration {
        ($tag:expr) => {
            migrant_lib::EmbeddedMigration::with_tag($tag)
                .up(include_str!(concat!("../../migrations/", $tag, "/up.sql")))
                .down(include_str!(concat!(
                    "../../migrations/",
                    $tag,
                    "/down.sql"
                )))
                .boxed()
        };
    }

    config
        .use_migrations(&[make_migration!("20260301010000_initial-tables")])
        .expect("Loading migrations failed");

    Migrator::with_config(&config)
        .direction(Direction::Up)
        .all(true)
        // by default this will set the `swallow_completion` to `false`
        // so no error will be returned if all migrations have already been ran
        .apply()
        .expect("Applying migrations failed");

    let _config = config
        .reload()
        .expect("Reloading config for migration failed");
}

/// [`AdStore`] backed by Postgres.
///
/// All spend mutations go through a Serializable transaction in
/// [`submit_event`](AdStore::submit_event), everything else is plain
/// prepared statements against the pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: DbPool,
}

impl PostgresStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdStore for PostgresStore {
    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, Error> {
        let client = self.pool.get().await?;
        let statement = client.prepare(SELECT_CAMPAIGN).await?;

        let row = client.query_opt(&statement, &[&id]).await?;

        Ok(row.as_ref().map(Campaign::from))
    }

    async fn active_placements(
        &self,
        position: Position,
    ) -> Result<Vec<(Placement, Campaign)>, Error> {
        let client = self.pool.get().await?;

        // Two queries instead of a join keeps the column names of both
        // `From<&Row>` mappings unambiguous.
        let placements_stmt = client
            .prepare("SELECT id, campaign_id, position, format, title, description, image_url, link_url, cta_text, is_active, created FROM placements WHERE is_active = TRUE AND position = $1")
            .await?;
        let placements: Vec<Placement> = client
            .query(&placements_stmt, &[&position])
            .await?
            .iter()
            .map(Placement::from)
            .collect();

        let campaign_ids: Vec<CampaignId> = placements
            .iter()
            .map(|placement| placement.campaign_id)
            .collect();

        let campaigns_stmt = client
            .prepare("SELECT id, advertiser_name, advertiser_logo, status, budget, spent, daily_budget, cpm_rate, cpc_rate, priority, target_modules, created, active_from, active_to FROM campaigns WHERE id = ANY($1)")
            .await?;
        let campaigns: Vec<Campaign> = client
            .query(&campaigns_stmt, &[&campaign_ids])
            .await?
            .iter()
            .map(Campaign::from)
            .collect();

        let pairs = placements
            .into_iter()
            .filter_map(|placement| {
                campaigns
                    .iter()
                    .find(|campaign| campaign.id == placement.campaign_id)
                    .map(|campaign| (placement, campaign.clone()))
            })
            .collect();

        Ok(pairs)
    }

    async fn revenue_since(
        &self,
        campaign: CampaignId,
        since: DateTime<Utc>,
    ) -> Result<UnifiedNum, Error> {
        let client = self.pool.get().await?;
        // SUM(INT8) yields NUMERIC, so cast it back
        let statement = client
            .prepare("SELECT COALESCE(SUM(revenue), 0)::BIGINT AS revenue FROM impression_events WHERE campaign_id = $1 AND created >= $2")
            .await?;

        let row = client.query_one(&statement, &[&campaign, &since]).await?;

        Ok(row.get("revenue"))
    }

    async fn submit_event(
        &self,
        submission: &EventSubmission,
        nominal: UnifiedNum,
    ) -> Result<Submission, Error> {
        let mut client = self.pool.get().await?;

        // The re-read of `spent`, the clamp and both writes must commit as
        // a single unit with respect to every other concurrent submission,
        // otherwise two near-simultaneous events could both charge the
        // last remaining budget.
        let transaction = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let select = transaction
            .prepare("SELECT id, advertiser_name, advertiser_logo, status, budget, spent, daily_budget, cpm_rate, cpc_rate, priority, target_modules, created, active_from, active_to FROM campaigns WHERE id = $1 FOR UPDATE")
            .await?;
        let row = transaction
            .query_opt(&select, &[&submission.campaign_id])
            .await?;

        let campaign = match row.as_ref() {
            Some(row) => Campaign::from(row),
            None => return Ok(Submission::Skipped(SkipReason::NotFound)),
        };

        if campaign.status != Status::Active {
            return Ok(Submission::Skipped(SkipReason::NotActive(campaign.status)));
        }

        let charged = campaign.clamp_charge(nominal);
        let new_spent = campaign
            .spent
            .checked_add(&charged)
            .ok_or(Error::Calculation)?;
        let completed = new_spent >= campaign.budget;
        let new_status = if completed {
            Status::Completed
        } else {
            campaign.status
        };

        let event = ImpressionEvent::new(submission, charged, Utc::now());

        let insert_event = transaction
            .prepare("INSERT INTO impression_events(id, event_type, campaign_id, placement_id, user_id, session_id, module, ip_address, user_agent, revenue, created) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)")
            .await?;
        transaction
            .execute(
                &insert_event,
                &[
                    &event.id,
                    &event.event_type,
                    &event.campaign_id,
                    &event.placement_id,
                    &event.context.user_id,
                    &event.context.session_id,
                    &event.context.module,
                    &event.context.ip_address,
                    &event.context.user_agent,
                    &event.revenue,
                    &event.created,
                ],
            )
            .await?;

        let update_campaign = transaction
            .prepare("UPDATE campaigns SET spent = $2, status = $3 WHERE id = $1")
            .await?;
        transaction
            .execute(
                &update_campaign,
                &[&campaign.id, &new_spent, &new_status],
            )
            .await?;

        transaction.commit().await?;

        Ok(Submission::Applied { charged, completed })
    }

    async fn events_summary(&self, campaign: CampaignId) -> Result<Vec<SummaryRow>, Error> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare("SELECT event_type, module, COUNT(*)::BIGINT AS count, COALESCE(SUM(revenue), 0)::BIGINT AS revenue FROM impression_events WHERE campaign_id = $1 GROUP BY event_type, module")
            .await?;

        let rows = client.query(&statement, &[&campaign]).await?;

        rows.iter()
            .map(|row| {
                let count =
                    u64::try_from(row.get::<_, i64>("count")).map_err(|_| Error::Calculation)?;

                Ok(SummaryRow {
                    event_type: row.get("event_type"),
                    module: row.get("module"),
                    count,
                    revenue: row.get("revenue"),
                })
            })
            .collect()
    }

    async fn tier_of(&self, user_id: &str) -> Result<Option<Tier>, Error> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare("SELECT tier, features FROM accounts WHERE user_id = $1")
            .await?;

        let row = client.query_opt(&statement, &[&user_id]).await?;

        Ok(row.map(|row| {
            let Json(features) = row.get("features");

            Tier {
                name: row.get("tier"),
                features,
            }
        }))
    }
}
