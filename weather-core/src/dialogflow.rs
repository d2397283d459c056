//! Dialogflow ES v2 webhook payloads.
//!
//! Only the fields this service reads or writes are modelled; everything
//! else in the platform's JSON is ignored.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    context::{ActiveContext, ContextUpdate, PendingContext, positive_count},
    handlers::Reply,
    intent::{Intent, UnknownIntent},
    model::{IntentParams, IntentRequest},
    provider::normalize_city,
};

const CITY_PARAM: &str = "geo-city";
const DATE_TIME_PARAM: &str = "date-time";
const TIME_PERIOD_PARAM: &str = "time-period";
const ALERT_TYPE_PARAM: &str = "AlertType";
const NUMBER_PARAM: &str = "number";

const CONTEXTS_SEGMENT: &str = "/contexts/";

#[derive(Debug, thiserror::Error)]
pub enum DialogflowError {
    #[error(transparent)]
    UnknownIntent(#[from] UnknownIntent),

    #[error("request has no session")]
    MissingSession,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub session: String,
    pub query_result: QueryResult,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub intent: IntentRef,
    #[serde(default)]
    pub output_contexts: Vec<WireContext>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContext {
    /// Full resource name: `{session}/contexts/{short name}`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl WireContext {
    pub fn short_name(&self) -> &str {
        self.name
            .rsplit_once(CONTEXTS_SEGMENT)
            .map(|(_, short)| short)
            .unwrap_or(&self.name)
    }
}

impl From<&WireContext> for ActiveContext {
    fn from(ctx: &WireContext) -> Self {
        ActiveContext {
            name: ctx.short_name().to_string(),
            lifespan: ctx.lifespan_count,
            parameters: ctx.parameters.clone(),
        }
    }
}

impl WebhookRequest {
    pub fn intent_name(&self) -> &str {
        &self.query_result.intent.display_name
    }

    /// Rejected without a session, since reply contexts are addressed under it.
    pub fn to_intent_request(&self) -> Result<IntentRequest, DialogflowError> {
        if self.session.trim().is_empty() {
            return Err(DialogflowError::MissingSession);
        }
        let intent = Intent::try_from(self.intent_name())?;

        Ok(IntentRequest {
            intent,
            params: decode_params(&self.query_result.parameters),
            query: self.query_result.query_text.clone(),
            contexts: self
                .query_result
                .output_contexts
                .iter()
                .map(ActiveContext::from)
                .collect(),
        })
    }
}

/// Read the platform's parameter map. Empty strings mean "not given".
pub fn decode_params(params: &Map<String, Value>) -> IntentParams {
    IntentParams {
        city: params.get(CITY_PARAM).and_then(normalize_city),
        date: params.get(DATE_TIME_PARAM).and_then(date_param),
        time_period: params.get(TIME_PERIOD_PARAM).and_then(time_period_param),
        alert_type: params
            .get(ALERT_TYPE_PARAM)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        num_days: params.get(NUMBER_PARAM).and_then(positive_count),
    }
}

/// `date-time` arrives as an RFC 3339 string or as an object holding one.
fn date_param(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Object(obj) => ["date_time", "startDateTime", "startDate"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .and_then(parse_date),
        _ => None,
    }
}

/// The calendar date in the offset the platform resolved the user's words in.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

fn time_period_param(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) if !obj.is_empty() => Some(value.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    pub fulfillment_messages: Vec<FulfillmentMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<WireContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfillmentMessage {
    pub text: TextMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMessage {
    pub text: Vec<String>,
}

impl WebhookResponse {
    pub fn from_reply(reply: &Reply, session: &str) -> Self {
        let output_contexts = reply
            .context
            .iter()
            .map(|update| context_for(update, session))
            .collect();

        Self {
            fulfillment_text: reply.text.clone(),
            fulfillment_messages: vec![FulfillmentMessage {
                text: TextMessage {
                    text: vec![reply.text.clone()],
                },
            }],
            output_contexts,
        }
    }
}

fn context_for(update: &ContextUpdate, session: &str) -> WireContext {
    let (tag, lifespan, parameters) = match update {
        ContextUpdate::Set(pending) => (pending.tag, PendingContext::LIFESPAN, pending.parameters()),
        ContextUpdate::Consume(tag) => (*tag, 0, Map::new()),
    };

    WireContext {
        name: format!("{session}{CONTEXTS_SEGMENT}{tag}"),
        lifespan_count: Some(lifespan),
        parameters,
    }
}
