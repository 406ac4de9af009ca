//! Typed metadata asset model.
//!
//! A [`Record`] is the envelope flowing through the pipeline: one typed
//! asset payload, identified by the URN carried inside the payload. The
//! envelope itself has no identity and is never mutated in place;
//! processors build a new record when they change anything.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form key/value annotations attached to an asset.
pub type Labels = BTreeMap<String, String>;

/// Fields shared by every asset type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub urn: String,
    pub name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub description: String,
}

/// A single column of a [`Table`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    #[serde(default)]
    pub total_rows: u64,
}

/// A relational table, warehouse table, or collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub profile: TableProfile,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub name: String,
    #[serde(default)]
    pub source: String,
}

/// A BI dashboard and the charts it hosts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub charts: Vec<Chart>,
    #[serde(default)]
    pub labels: Labels,
}

/// A message broker topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub partitions: u32,
    #[serde(default)]
    pub labels: Labels,
}

/// A person or service account known to a data system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub labels: Labels,
}

/// An object storage bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub storage_type: String,
    #[serde(default)]
    pub labels: Labels,
}

/// One typed metadata asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    Table(Table),
    Dashboard(Dashboard),
    Topic(Topic),
    User(User),
    Bucket(Bucket),
}

impl Asset {
    pub fn resource(&self) -> &Resource {
        match self {
            Asset::Table(t) => &t.resource,
            Asset::Dashboard(d) => &d.resource,
            Asset::Topic(t) => &t.resource,
            Asset::User(u) => &u.resource,
            Asset::Bucket(b) => &b.resource,
        }
    }

    pub fn labels(&self) -> &Labels {
        match self {
            Asset::Table(t) => &t.labels,
            Asset::Dashboard(d) => &d.labels,
            Asset::Topic(t) => &t.labels,
            Asset::User(u) => &u.labels,
            Asset::Bucket(b) => &b.labels,
        }
    }

    pub fn labels_mut(&mut self) -> &mut Labels {
        match self {
            Asset::Table(t) => &mut t.labels,
            Asset::Dashboard(d) => &mut d.labels,
            Asset::Topic(t) => &mut t.labels,
            Asset::User(u) => &mut u.labels,
            Asset::Bucket(b) => &mut b.labels,
        }
    }

    /// Stable lowercase name of the asset type, as used in serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Asset::Table(_) => "table",
            Asset::Dashboard(_) => "dashboard",
            Asset::Topic(_) => "topic",
            Asset::User(_) => "user",
            Asset::Bucket(_) => "bucket",
        }
    }
}

/// Envelope carrying exactly one asset through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    data: Asset,
}

impl Record {
    pub fn new(data: Asset) -> Self {
        Self { data }
    }

    /// The URN identifying the asset inside this record.
    pub fn urn(&self) -> &str {
        &self.data.resource().urn
    }

    pub fn data(&self) -> &Asset {
        &self.data
    }

    pub fn into_data(self) -> Asset {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table {
            resource: Resource {
                urn: "my-db.orders".into(),
                name: "orders".into(),
                service: "postgres".into(),
                ..Resource::default()
            },
            columns: vec![Column {
                name: "id".into(),
                data_type: "bigint".into(),
                ..Column::default()
            }],
            profile: TableProfile { total_rows: 42 },
            labels: Labels::new(),
        }
    }

    #[test]
    fn record_exposes_urn_from_payload() {
        let record = Record::new(Asset::Table(sample_table()));
        assert_eq!(record.urn(), "my-db.orders");
        assert_eq!(record.data().kind(), "table");
    }

    #[test]
    fn asset_serializes_with_type_tag() {
        let json = serde_json::to_string(&Asset::Table(sample_table())).unwrap();
        assert!(json.contains("\"type\":\"table\""));
        assert!(json.contains("\"urn\":\"my-db.orders\""));

        let parsed: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Asset::Table(sample_table()));
    }

    #[test]
    fn labels_mut_reaches_every_variant() {
        let mut asset = Asset::User(User {
            resource: Resource {
                urn: "ldap.jdoe".into(),
                name: "jdoe".into(),
                ..Resource::default()
            },
            email: "jdoe@example.com".into(),
            labels: Labels::new(),
        });
        asset.labels_mut().insert("team".into(), "data".into());
        assert_eq!(asset.labels().get("team"), Some(&"data".to_string()));
    }
}
