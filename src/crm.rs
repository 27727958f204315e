//! HubSpot-style [`CrmClient`]: one endpoint, contact creation.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::contract::{CrmClient, CrmError, StoredRecord};

const CONTACT_ENDPOINT: &str = "https://api.hubapi.com/contacts/v1/contact";

#[derive(Debug, Serialize)]
struct ContactProperty<'a> {
    property: &'a str,
    value: Option<&'a str>,
}

/// Wire shape: `{ properties: [{ property, value }, ...] }`.
#[derive(Debug, Serialize)]
struct NewContact<'a> {
    properties: Vec<ContactProperty<'a>>,
}

fn contact_body(record: &StoredRecord) -> NewContact<'_> {
    NewContact {
        properties: vec![
            ContactProperty {
                property: "name",
                value: record.name.as_deref(),
            },
            ContactProperty {
                property: "sex",
                value: record.sex.as_deref(),
            },
        ],
    }
}

pub struct HubSpotClient {
    http: reqwest::Client,
    api_key: String,
}

impl HubSpotClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl CrmClient for HubSpotClient {
    async fn create_contact(&self, record: &StoredRecord) -> Result<(), CrmError> {
        let body = contact_body(record);
        debug!(id = record.id, "[CRM] Posting contact");

        let response = self
            .http
            .post(CONTACT_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            return Err(format!("contact creation returned {status}: {text}").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_both_fields_as_a_property_list() {
        let record = StoredRecord {
            id: 1,
            name: Some("Mary".into()),
            sex: Some("F".into()),
        };
        let json = serde_json::to_value(contact_body(&record)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "properties": [
                    { "property": "name", "value": "Mary" },
                    { "property": "sex", "value": "F" }
                ]
            })
        );
    }

    #[test]
    fn absent_fields_serialise_as_null_values() {
        let record = StoredRecord {
            id: 2,
            name: None,
            sex: Some("M".into()),
        };
        let json = serde_json::to_value(contact_body(&record)).unwrap();
        assert_eq!(json["properties"][0]["value"], serde_json::Value::Null);
        assert_eq!(json["properties"][1]["value"], "M");
    }
}
