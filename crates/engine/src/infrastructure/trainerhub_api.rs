//! TrainerHub REST API client
//!
//! Implements the inventory, mutation, species roller and species image
//! ports against the community site's HTTP API. Response bodies are parsed
//! into closed wire structs and converted to domain types here, so nothing
//! loosely shaped leaks into the pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use trainerhub_domain::{InventoryLedger, Monster, MonsterId, MonsterPatch, TrainerId};

use crate::infrastructure::ports::{
    BerryOutcome, BerryRequest, InventoryPort, MonsterMutationPort, MutationOutcome,
    PastryRequest, ServiceError, SpeciesImagePort, SpeciesRollerPort,
};

/// Client for the TrainerHub API
#[derive(Clone)]
pub struct HttpTrainerHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTrainerHubClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and return the status with the raw body.
    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), ServiceError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(ServiceError::request)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ServiceError::request)?;
        Ok((status, body))
    }

    /// Send a read request; any non-2xx status is a failure.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(ServiceError::request(format!("{status}: {}", body.trim())));
        }
        parse(&body)
    }

    /// Send a mutation request.
    ///
    /// Mutation endpoints report business failures (e.g. "Cannot apply Bluk
    /// Berry to this monster") with an error status and a
    /// `{success: false, message}` body; those become unsuccessful replies
    /// instead of transport errors.
    async fn mutate<T>(&self, request: RequestBuilder) -> Result<T, ServiceError>
    where
        T: DeserializeOwned + From<FailureBody>,
    {
        let (status, body) = self.send(request).await?;
        if status.is_success() {
            return parse(&body);
        }
        match serde_json::from_str::<FailureBody>(&body) {
            Ok(failure) if !failure.success => Ok(T::from(failure)),
            _ => Err(ServiceError::request(format!("{status}: {}", body.trim()))),
        }
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(ServiceError::invalid_response)
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct InventoryEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<InventoryData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InventoryData {
    #[serde(default)]
    berries: Option<BTreeMap<String, i64>>,
    #[serde(default)]
    pastries: Option<BTreeMap<String, i64>>,
}

impl InventoryEnvelope {
    fn into_ledger(self) -> Result<InventoryLedger, ServiceError> {
        if !self.success {
            return Err(ServiceError::request(
                self.message
                    .unwrap_or_else(|| "Inventory request was not successful".to_string()),
            ));
        }
        let data = self.data.unwrap_or_default();
        Ok(InventoryLedger {
            berries: clamp_counts(data.berries.unwrap_or_default()),
            pastries: clamp_counts(data.pastries.unwrap_or_default()),
        })
    }
}

// Counts below zero never reach the ledger.
fn clamp_counts(counts: BTreeMap<String, i64>) -> BTreeMap<String, u32> {
    counts
        .into_iter()
        .map(|(item, count)| (item, u32::try_from(count.max(0)).unwrap_or(u32::MAX)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct FailureBody {
    #[serde(default)]
    success: bool,
    #[serde(default, alias = "error")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct RenameBody<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct RenameReply {
    success: bool,
    #[serde(default)]
    data: Option<MonsterPatch>,
    #[serde(default)]
    message: Option<String>,
}

impl From<FailureBody> for RenameReply {
    fn from(failure: FailureBody) -> Self {
        Self {
            success: false,
            data: None,
            message: failure.message,
        }
    }
}

impl From<RenameReply> for MutationOutcome {
    fn from(reply: RenameReply) -> Self {
        Self {
            success: reply.success,
            message: reply.message,
            monster: reply.data,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PastryBody<'a> {
    monster_id: MonsterId,
    pastry_name: &'a str,
    trainer_id: TrainerId,
    selected_value: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BerryBody<'a> {
    monster_id: MonsterId,
    berry_name: &'a str,
    trainer_id: TrainerId,
    species_value: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemReply {
    success: bool,
    #[serde(default)]
    monster: Option<MonsterPatch>,
    #[serde(default)]
    new_monster: Option<Monster>,
    #[serde(default)]
    needs_selection: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

impl From<FailureBody> for ItemReply {
    fn from(failure: FailureBody) -> Self {
        Self {
            success: false,
            monster: None,
            new_monster: None,
            needs_selection: None,
            message: failure.message,
        }
    }
}

impl From<ItemReply> for MutationOutcome {
    fn from(reply: ItemReply) -> Self {
        Self {
            success: reply.success,
            message: reply.message,
            monster: reply.monster,
        }
    }
}

impl From<ItemReply> for BerryOutcome {
    fn from(reply: ItemReply) -> Self {
        Self {
            success: reply.success,
            message: reply.message,
            monster: reply.monster,
            new_monster: reply.new_monster,
            needs_selection: reply.needs_selection.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
struct RollBody {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct RollReply {
    #[serde(default)]
    species: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ImagesBody {
    species: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagesReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    species_images: BTreeMap<String, SpeciesImage>,
}

#[derive(Debug, Deserialize)]
struct SpeciesImage {
    #[serde(default)]
    image_url: Option<String>,
}

impl ImagesReply {
    fn into_map(self) -> BTreeMap<String, String> {
        if !self.success {
            return BTreeMap::new();
        }
        self.species_images
            .into_iter()
            .filter_map(|(species, image)| {
                image
                    .image_url
                    .filter(|url| !url.trim().is_empty())
                    .map(|url| (species, url))
            })
            .collect()
    }
}

// =============================================================================
// Port Implementations
// =============================================================================

#[async_trait]
impl InventoryPort for HttpTrainerHubClient {
    async fn get_inventory(&self, trainer_id: TrainerId) -> Result<InventoryLedger, ServiceError> {
        let request = self
            .client
            .get(self.url(&format!("/trainers/{trainer_id}/inventory")));
        self.fetch::<InventoryEnvelope>(request).await?.into_ledger()
    }
}

#[async_trait]
impl MonsterMutationPort for HttpTrainerHubClient {
    async fn rename(
        &self,
        monster_id: MonsterId,
        new_name: String,
    ) -> Result<MutationOutcome, ServiceError> {
        let request = self
            .client
            .put(self.url(&format!("/monsters/{monster_id}")))
            .json(&RenameBody { name: &new_name });
        let reply: RenameReply = self.mutate(request).await?;
        Ok(reply.into())
    }

    async fn use_pastry(&self, request: PastryRequest) -> Result<MutationOutcome, ServiceError> {
        let body = PastryBody {
            monster_id: request.monster_id,
            pastry_name: &request.pastry_type,
            trainer_id: request.trainer_id,
            selected_value: &request.value,
        };
        let http = self.client.post(self.url("/items/use-pastry")).json(&body);
        let reply: ItemReply = self.mutate(http).await?;
        Ok(reply.into())
    }

    async fn use_berry(&self, request: BerryRequest) -> Result<BerryOutcome, ServiceError> {
        let body = BerryBody {
            monster_id: request.monster_id,
            berry_name: &request.berry_type,
            trainer_id: request.trainer_id,
            species_value: request.species.as_deref(),
        };
        let http = self.client.post(self.url("/items/use-berry")).json(&body);
        let reply: ItemReply = self.mutate(http).await?;
        Ok(reply.into())
    }
}

#[async_trait]
impl SpeciesRollerPort for HttpTrainerHubClient {
    async fn roll(&self, count: usize) -> Result<Vec<String>, ServiceError> {
        let request = self
            .client
            .post(self.url("/species/roll"))
            .json(&RollBody { count });
        let reply: RollReply = self.fetch(request).await?;
        Ok(reply.species)
    }
}

#[async_trait]
impl SpeciesImagePort for HttpTrainerHubClient {
    async fn lookup(&self, species: Vec<String>) -> Result<BTreeMap<String, String>, ServiceError> {
        let request = self
            .client
            .post(self.url("/species/images"))
            .json(&ImagesBody { species });
        let reply: ImagesReply = self.fetch(request).await?;
        Ok(reply.into_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_envelope_clamps_negative_counts() {
        let envelope: InventoryEnvelope = parse(
            r#"{"success":true,"data":{"berries":{"Oran Berry":2,"Bad Berry":-3},"pastries":null}}"#,
        )
        .unwrap();

        let ledger = envelope.into_ledger().unwrap();

        assert_eq!(ledger.berries.get("Oran Berry"), Some(&2));
        assert_eq!(ledger.berries.get("Bad Berry"), Some(&0));
        assert!(ledger.pastries.is_empty());
    }

    #[test]
    fn unsuccessful_inventory_is_an_error() {
        let envelope: InventoryEnvelope =
            parse(r#"{"success":false,"message":"Trainer not found"}"#).unwrap();
        assert_eq!(
            envelope.into_ledger(),
            Err(ServiceError::RequestFailed("Trainer not found".to_string()))
        );
    }

    #[test]
    fn berry_reply_keeps_new_monster_and_selection_flag() {
        let reply: ItemReply = parse(
            r#"{
                "success": true,
                "message": "Successfully applied Divest Berry",
                "monster": {"species2": null},
                "newMonster": {"id": 77, "name": "Agumon", "species1": "Agumon"},
                "needsSelection": false
            }"#,
        )
        .unwrap();

        let outcome = BerryOutcome::from(reply);

        assert!(outcome.success);
        assert_eq!(outcome.monster.and_then(|m| m.species2), Some(None));
        assert_eq!(outcome.new_monster.map(|m| m.id), Some(MonsterId::new(77)));
        assert!(!outcome.needs_selection);
    }

    #[test]
    fn failure_body_becomes_rejected_outcome() {
        let failure: FailureBody =
            parse(r#"{"success":false,"error":"Cannot apply Bluk Berry to this monster"}"#).unwrap();
        let outcome = BerryOutcome::from(ItemReply::from(failure));
        assert!(!outcome.success);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Cannot apply Bluk Berry to this monster")
        );
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        let result = parse::<ItemReply>(r#"{"monster": 5}"#);
        assert!(matches!(result, Err(ServiceError::InvalidResponse(_))));
    }

    #[test]
    fn image_reply_drops_missing_urls() {
        let reply: ImagesReply = parse(
            r#"{"success":true,"speciesImages":{
                "Pikachu":{"image_url":"https://img/pikachu.png"},
                "Agumon":{},
                "Eevee":{"image_url":""}
            }}"#,
        )
        .unwrap();

        let map = reply.into_map();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Pikachu").map(String::as_str), Some("https://img/pikachu.png"));
    }

    #[test]
    fn berry_body_uses_site_field_names() {
        let body = BerryBody {
            monster_id: MonsterId::new(5),
            berry_name: "Patama Berry",
            trainer_id: TrainerId::new(2),
            species_value: Some("Eevee"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["monsterId"], 5);
        assert_eq!(json["berryName"], "Patama Berry");
        assert_eq!(json["trainerId"], 2);
        assert_eq!(json["speciesValue"], "Eevee");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpTrainerHubClient::new("http://host/api/", None, Duration::from_secs(1));
        assert_eq!(client.url("/species/roll"), "http://host/api/species/roll");
    }
}
