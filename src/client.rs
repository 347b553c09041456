use crate::config::{Config, TimeoutsConfig};
use crate::error::ExecError;
use crate::executor::{HttpCall, RequestExecutor};
use crate::models::{CombinationType, KellyBet, ManualBet, ManualCombination, RaceLocator};
use crate::normalizer::{normalize_text, Envelope, Schema};
use crate::request::{Method, RequestBuilder, RequestDescriptor};
use crate::retry::RetryPolicy;
use crate::routing::Gateway;
use crate::schemas;
use crate::store::{Family, Stores};
use crate::validation::{self, COMBINATION_LIMIT, DAILY_LIMIT};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Entry point for every PMU query and betting operation.
///
/// Stateful families publish into the shared [`Stores`]; the stateless
/// backend operations return their envelope directly. Input is validated
/// and the route resolved before anything is published or sent.
pub struct PmuClient {
    gateway: Gateway,
    stores: Arc<Stores>,
    timeouts: TimeoutsConfig,
    retry_policy: RetryPolicy,
}

impl PmuClient {
    /// Build a client from config, sharing `stores` with other consumers.
    pub fn new(config: &Config, stores: Arc<Stores>) -> Result<Self, ExecError> {
        let gateway = Gateway::new(config.routing_table(), RequestExecutor::new()?);
        Ok(Self::with_gateway(
            gateway,
            stores,
            config.timeouts.clone(),
            config.retry_policy(),
        ))
    }

    /// Build a client around an existing gateway.
    pub fn with_gateway(
        gateway: Gateway,
        stores: Arc<Stores>,
        timeouts: TimeoutsConfig,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            stores,
            timeouts,
            retry_policy,
        }
    }

    /// Shared per-family state this client publishes into.
    pub fn stores(&self) -> &Arc<Stores> {
        &self.stores
    }

    /// Routing gateway used for every call.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Execute a prepared call and normalize the body. GETs go through the
    /// retry policy; mutations are sent exactly once.
    async fn fetch(
        &self,
        call: &HttpCall,
        timeout: Duration,
        schema: &Schema,
    ) -> Result<Envelope, ExecError> {
        let raw = match call.method {
            Method::Get => {
                self.retry_policy
                    .retry(|| self.gateway.execute(call, timeout))
                    .await?
            }
            Method::Post | Method::Delete => self.gateway.execute(call, timeout).await?,
        };

        let envelope = normalize_text(&raw.text, schema);
        if let Some(diagnostic) = envelope.diagnostic() {
            warn!("{} {}: payload normalized with defaults: {}", call.method, call.url, diagnostic);
        }
        Ok(envelope)
    }

    /// Run one request for a stateful family: begin, fetch, then publish
    /// success or failure under the ticket taken at begin. If this future is
    /// dropped mid-flight the family stops reporting `loading`.
    async fn run(
        &self,
        family: Family,
        request: RequestDescriptor,
        schema: Schema,
    ) -> Result<Envelope, ExecError> {
        let call = self.gateway.prepare(&request)?;
        let pending = self.stores.get(family).start();
        debug!("{}: {} started (#{})", family, request.endpoint(), pending.sequence());

        match self.fetch(&call, request.timeout(), &schema).await {
            Ok(envelope) => {
                pending.succeed(envelope.clone());
                Ok(envelope)
            }
            Err(err) => {
                warn!("{}: {} failed: {}", family, request.endpoint(), err);
                pending.fail_with(err.user_message(), schema.empty());
                Err(err)
            }
        }
    }

    async fn call(&self, request: RequestDescriptor, schema: Schema) -> Result<Envelope, ExecError> {
        let call = self.gateway.prepare(&request)?;
        self.fetch(&call, request.timeout(), &schema).await
    }

    // ========================================================================
    // Programme (provider)
    // ========================================================================

    /// Day programme; `date` is compact or ISO, `None` for today.
    pub async fn load_programme(&self, date: Option<&str>) -> Result<Envelope, ExecError> {
        let date = validation::compact_date(date)?;
        let request = RequestDescriptor::get("programme", "/api/pmu/{}")
            .param(date)
            .timeout(self.timeouts.for_family(Family::Programme))
            .build();
        self.run(Family::Programme, request, schemas::programme()).await
    }

    /// One reunion of the day with its races.
    pub async fn load_reunion(&self, reunion: i64, date: Option<&str>) -> Result<Envelope, ExecError> {
        let reunion = validation::positive_id(reunion, "reunion number")?;
        let date = validation::compact_date(date)?;
        let request = RequestDescriptor::get("reunion", "/api/pmu/{}/R{}")
            .param(date)
            .param(reunion)
            .timeout(self.timeouts.for_family(Family::Reunion))
            .build();
        self.run(Family::Reunion, request, schemas::reunion()).await
    }

    /// Runners of one race.
    pub async fn load_participants(
        &self,
        reunion: i64,
        course: i64,
        date: Option<&str>,
    ) -> Result<Envelope, ExecError> {
        let reunion = validation::positive_id(reunion, "reunion number")?;
        let course = validation::positive_id(course, "course number")?;
        let date = validation::compact_date(date)?;
        let request = RequestDescriptor::get("participants", "/api/pmu/{}/R{}/C{}/participants")
            .param(date)
            .param(reunion)
            .param(course)
            .timeout(self.timeouts.for_family(Family::Participants))
            .build();
        self.run(Family::Participants, request, schemas::participants()).await
    }

    // ========================================================================
    // Race analytics (backend)
    // ========================================================================

    /// Tiercé combinations; `limit` is clamped to 1..=50.
    pub async fn fetch_tierce(&self, race_id: i64, ordre: bool, limit: i64) -> Result<Envelope, ExecError> {
        let race_id = validation::positive_id(race_id, "race id")?;
        let request = RequestDescriptor::get("combinations_tierce", "/api/pmu/races/{}/combinations/tierce")
            .param(race_id)
            .query("ordre", ordre)
            .query("limit", validation::clamp_limit(limit, COMBINATION_LIMIT))
            .timeout(self.timeouts.for_family(Family::Combinations))
            .build();
        self.run(Family::Combinations, request, schemas::combinations()).await
    }

    /// Quinté combinations; `limit` is clamped to 1..=50.
    pub async fn fetch_quinte(&self, race_id: i64, limit: i64) -> Result<Envelope, ExecError> {
        let race_id = validation::positive_id(race_id, "race id")?;
        let request = RequestDescriptor::get("combinations_quinte", "/api/pmu/races/{}/combinations/quinte")
            .param(race_id)
            .query("limit", validation::clamp_limit(limit, COMBINATION_LIMIT))
            .timeout(self.timeouts.for_family(Family::Combinations))
            .build();
        self.run(Family::Combinations, request, schemas::combinations()).await
    }

    /// Value bets for a race; `bankroll` is clamped to 10..=1_000_000.
    pub async fn fetch_value_bets(&self, race_id: i64, bankroll: Decimal) -> Result<Envelope, ExecError> {
        let race_id = validation::positive_id(race_id, "race id")?;
        let request = RequestDescriptor::get("value_bets", "/api/pmu/races/{}/value-bets")
            .param(race_id)
            .query("bankroll", validation::clamp_bankroll(bankroll).normalize())
            .timeout(self.timeouts.for_family(Family::ValueBets))
            .build();
        self.run(Family::ValueBets, request, schemas::value_bets()).await
    }

    /// Best value bets across the day; `limit` is clamped to 1..=20.
    pub async fn fetch_top_bets(
        &self,
        date: Option<&str>,
        bankroll: Decimal,
        limit: i64,
    ) -> Result<Envelope, ExecError> {
        let date = validation::iso_date(date)?;
        let request = RequestDescriptor::get("daily_top_bets", "/api/pmu/daily/top-bets")
            .query("date", date)
            .query("bankroll", validation::clamp_bankroll(bankroll).normalize())
            .query("limit", validation::clamp_limit(limit, DAILY_LIMIT))
            .timeout(self.timeouts.for_family(Family::DailyBets))
            .build();
        self.run(Family::DailyBets, request, schemas::daily_top_bets()).await
    }

    /// Best combinations of the day for one type; `limit` is clamped to 1..=20.
    pub async fn fetch_top_combinations(
        &self,
        date: Option<&str>,
        kind: CombinationType,
        limit: i64,
    ) -> Result<Envelope, ExecError> {
        let date = validation::iso_date(date)?;
        let request = RequestDescriptor::get("daily_top_combinations", "/api/pmu/daily/top-combinations")
            .query("date", date)
            .query("type", kind)
            .query("limit", validation::clamp_limit(limit, DAILY_LIMIT))
            .timeout(self.timeouts.for_family(Family::DailyBets))
            .build();
        self.run(Family::DailyBets, request, schemas::daily_top_combinations()).await
    }

    // ========================================================================
    // Betting operations (backend, stateless)
    // ========================================================================

    /// Map provider coordinates (date, reunion, course) to the backend race id.
    pub async fn resolve_race_id(&self, locator: &RaceLocator) -> Result<Envelope, ExecError> {
        validation::positive_id(locator.reunion as i64, "reunion number")?;
        validation::positive_id(locator.course as i64, "course number")?;
        let locator = RaceLocator {
            date: validation::iso_date(Some(&locator.date))?,
            ..locator.clone()
        };
        let request = self
            .backend(Method::Post, "race_resolve", "/api/pmu/races/resolve-id")
            .json(to_body(&locator)?)
            .build();

        match self.call(request, schemas::race_resolution()).await {
            Err(ExecError::HttpStatus { status: 404, body }) => {
                warn!("race id resolution endpoint not available on backend");
                Err(ExecError::HttpStatus {
                    status: 404,
                    body: json!({
                        "error": "race id resolution endpoint not available on backend",
                        "upstream_body": body,
                    })
                    .to_string(),
                })
            }
            other => other,
        }
    }

    /// Hand model predictions for a day to the backend for bet selection.
    pub async fn process_predictions(&self, date: &str, predictions: Value) -> Result<Envelope, ExecError> {
        let date = validation::iso_date(Some(date))?;
        let request = self
            .backend(Method::Post, "process_predictions", "/api/pmu/betting/process-predictions")
            .json(json!({ "date": date, "predictions": predictions }))
            .build();
        self.call(request, schemas::backend_result()).await
    }

    /// Bets selected for a day.
    pub async fn daily_bets(&self, date: &str) -> Result<Envelope, ExecError> {
        self.list_for_date("daily_bets", "/api/pmu/betting/daily-bets", date).await
    }

    /// Stored value bets for a day.
    pub async fn value_bets_for_date(&self, date: &str) -> Result<Envelope, ExecError> {
        self.list_for_date("value_bets_for_date", "/api/pmu/betting/value-bets", date).await
    }

    /// Stored combinations for a day.
    pub async fn combinations_for_date(&self, date: &str) -> Result<Envelope, ExecError> {
        self.list_for_date("combinations_for_date", "/api/pmu/betting/combinations", date).await
    }

    /// Official results and bet outcomes for a day.
    pub async fn race_results(&self, date: &str) -> Result<Envelope, ExecError> {
        self.list_for_date("race_results", "/api/pmu/betting/race-results", date).await
    }

    /// Daily performance report.
    pub async fn generate_report(&self, date: &str) -> Result<Envelope, ExecError> {
        self.list_for_date("generate_report", "/api/pmu/betting/generate-report", date).await
    }

    /// Kelly-sized bets for a day.
    pub async fn kelly_bets(&self, date: &str) -> Result<Envelope, ExecError> {
        self.list_for_date("kelly_bets", "/api/pmu/betting/kelly-bets", date).await
    }

    /// Manually entered bets for a day.
    pub async fn manual_bets(&self, date: &str) -> Result<Envelope, ExecError> {
        self.list_for_date("manual_bets", "/api/pmu/betting/manual-bets", date).await
    }

    /// Ask the backend to pull official results for finished races.
    pub async fn fetch_results(&self) -> Result<Envelope, ExecError> {
        let request = self
            .backend(Method::Post, "fetch_results", "/api/pmu/betting/fetch-results")
            .build();
        self.call(request, schemas::backend_result()).await
    }

    /// Delete every stored bet for a date.
    pub async fn clear_bets(&self, date: &str) -> Result<Envelope, ExecError> {
        let date = validation::iso_date(Some(date))?;
        let request = self
            .backend(Method::Delete, "clear_bets", "/api/pmu/betting/clear")
            .query("date", date)
            .build();
        self.call(request, schemas::backend_result()).await
    }

    /// Record a Kelly-sized bet; the bankroll is clamped before sending.
    pub async fn add_kelly_bet(&self, bet: &KellyBet) -> Result<Envelope, ExecError> {
        validation::positive_id(bet.race_id as i64, "race id")?;
        validation::positive_id(bet.horse_number as i64, "horse number")?;
        if bet.probability <= Decimal::ZERO || bet.probability > Decimal::ONE {
            return Err(ExecError::validation("probability must be in (0, 1]"));
        }
        if bet.odds <= Decimal::ONE {
            return Err(ExecError::validation("odds must be greater than 1"));
        }
        let bet = KellyBet {
            date: validation::iso_date(Some(&bet.date))?,
            bankroll: validation::clamp_bankroll(bet.bankroll),
            ..bet.clone()
        };
        let request = self
            .backend(Method::Post, "kelly_bets_create", "/api/pmu/betting/kelly-bets")
            .json(to_body(&bet)?)
            .build();
        self.call(request, schemas::backend_result()).await
    }

    /// Record a manual bet.
    pub async fn add_manual_bet(&self, bet: &ManualBet) -> Result<Envelope, ExecError> {
        validation::positive_id(bet.race_id as i64, "race id")?;
        validation::positive_id(bet.horse_number as i64, "horse number")?;
        if bet.stake <= Decimal::ZERO {
            return Err(ExecError::validation("stake must be positive"));
        }
        let bet = ManualBet {
            date: validation::iso_date(Some(&bet.date))?,
            ..bet.clone()
        };
        let request = self
            .backend(Method::Post, "manual_bets_create", "/api/pmu/betting/manual-bets")
            .json(to_body(&bet)?)
            .build();
        self.call(request, schemas::backend_result()).await
    }

    /// Delete a manual bet by id.
    pub async fn delete_manual_bet(&self, id: i64) -> Result<Envelope, ExecError> {
        self.delete_by_id("manual_bets_delete", "/api/pmu/betting/manual-bets/{}", id).await
    }

    /// Record a manual tiercé (3 horses) or quinté (5 horses).
    pub async fn add_manual_combination(&self, combination: &ManualCombination) -> Result<Envelope, ExecError> {
        validation::positive_id(combination.race_id as i64, "race id")?;
        let expected = match combination.kind {
            CombinationType::Tierce => 3,
            CombinationType::Quinte => 5,
        };
        let mut horses = combination.horses.clone();
        horses.sort_unstable();
        horses.dedup();
        if combination.horses.len() != expected || horses.len() != expected || horses[0] == 0 {
            return Err(ExecError::validation(format!(
                "a {} needs {} distinct horse numbers, got {:?}",
                combination.kind, expected, combination.horses
            )));
        }
        if combination.stake <= Decimal::ZERO {
            return Err(ExecError::validation("stake must be positive"));
        }
        let combination = ManualCombination {
            date: validation::iso_date(Some(&combination.date))?,
            ..combination.clone()
        };
        let request = self
            .backend(Method::Post, "manual_combinations_create", "/api/pmu/betting/manual-combinations")
            .json(to_body(&combination)?)
            .build();
        self.call(request, schemas::backend_result()).await
    }

    /// Manual combinations for a day, optionally of one type.
    pub async fn manual_combinations(
        &self,
        date: &str,
        kind: Option<CombinationType>,
    ) -> Result<Envelope, ExecError> {
        let date = validation::iso_date(Some(date))?;
        let request = self
            .backend(Method::Get, "manual_combinations", "/api/pmu/betting/manual-combinations")
            .query("date", date)
            .query_opt("type", kind)
            .build();
        self.call(request, schemas::backend_result()).await
    }

    /// Delete a manual combination by id.
    pub async fn delete_manual_combination(&self, id: i64) -> Result<Envelope, ExecError> {
        self.delete_by_id("manual_combinations_delete", "/api/pmu/betting/manual-combinations/{}", id)
            .await
    }

    /// Stake and return totals of the manual bets for a day.
    pub async fn manual_bets_summary(&self, date: &str) -> Result<Envelope, ExecError> {
        let date = validation::iso_date(Some(date))?;
        let request = self
            .backend(Method::Get, "manual_bets_summary", "/api/pmu/betting/manual-bets-summary")
            .query("date", date)
            .build();
        self.call(request, schemas::manual_bets_summary()).await
    }

    /// Delete a selected daily bet by id.
    pub async fn delete_daily_bet(&self, id: i64) -> Result<Envelope, ExecError> {
        self.delete_by_id("daily_bets_delete", "/api/pmu/betting/daily-bets/{}", id).await
    }

    /// Delete a stored value bet by id.
    pub async fn delete_value_bet(&self, id: i64) -> Result<Envelope, ExecError> {
        self.delete_by_id("value_bets_delete", "/api/pmu/betting/value-bets/{}", id).await
    }

    /// Delete a stored combination by id.
    pub async fn delete_combination(&self, id: i64) -> Result<Envelope, ExecError> {
        self.delete_by_id("combinations_delete", "/api/pmu/betting/combinations/{}", id).await
    }

    fn backend(&self, method: Method, endpoint: &'static str, template: &'static str) -> RequestBuilder {
        RequestDescriptor::builder(endpoint, method, template).timeout(self.timeouts.for_backend())
    }

    async fn list_for_date(
        &self,
        endpoint: &'static str,
        template: &'static str,
        date: &str,
    ) -> Result<Envelope, ExecError> {
        let date = validation::iso_date(Some(date))?;
        let request = self
            .backend(Method::Get, endpoint, template)
            .query("date", date)
            .build();
        self.call(request, schemas::backend_result()).await
    }

    async fn delete_by_id(
        &self,
        endpoint: &'static str,
        template: &'static str,
        id: i64,
    ) -> Result<Envelope, ExecError> {
        let id = validation::positive_id(id, "id")?;
        let request = self.backend(Method::Delete, endpoint, template).param(id).build();
        self.call(request, schemas::backend_result()).await
    }
}

fn to_body<T: Serialize>(payload: &T) -> Result<Value, ExecError> {
    serde_json::to_value(payload)
        .map_err(|e| ExecError::validation(format!("payload not serializable: {e}")))
}
