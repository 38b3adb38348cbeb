//! MongoDB-backed document store

use super::{Document, DocumentSink, DocumentSource};
use crate::error::{PipelineError, Result};
use mongodb::bson::{self, Bson, Document as BsonDocument};
use mongodb::sync::Client;
use serde_json::Value;
use tracing::{debug, info};

/// Blocking MongoDB client
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Parse the connection string; the server is contacted on first use
    pub fn connect(uri: &str) -> Result<Self> {
        if uri.trim().is_empty() {
            return Err(PipelineError::Connection("connection string is empty".to_string()));
        }
        let client = Client::with_uri_str(uri)?;
        Ok(Self { client })
    }
}

fn to_json(doc: BsonDocument) -> Result<Document> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(PipelineError::Data(format!("record is not an object: {}", other))),
    }
}

impl DocumentSource for MongoStore {
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let coll = self.client.database(database).collection::<BsonDocument>(collection);
        let cursor = coll.find(None, None)?;

        let mut documents = Vec::new();
        for doc in cursor {
            documents.push(to_json(doc?)?);
        }

        info!(database, collection, records = documents.len(), "fetched collection");
        Ok(documents)
    }
}

impl DocumentSink for MongoStore {
    fn insert_many(&self, database: &str, collection: &str, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let records: Vec<BsonDocument> = documents
            .iter()
            .map(|doc| bson::to_document(doc).map_err(|e| PipelineError::Serialization(e.to_string())))
            .collect::<Result<_>>()?;

        debug!(database, collection, records = records.len(), "inserting records");
        let coll = self.client.database(database).collection::<BsonDocument>(collection);
        let result = coll.insert_many(records, None)?;
        Ok(result.inserted_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_bson_to_json_keeps_order_and_numbers() {
        let record = doc! {"zeta": 1_i32, "alpha": -1.5_f64, "label": "na"};
        let json = to_json(record).unwrap();

        let keys: Vec<&String> = json.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "label"]);
        assert_eq!(json["zeta"], Value::from(1));
        assert_eq!(json["alpha"], Value::from(-1.5));
    }

    #[test]
    fn test_empty_uri_is_rejected() {
        assert!(matches!(MongoStore::connect("  "), Err(PipelineError::Connection(_))));
    }

    #[test]
    fn test_malformed_uri_is_a_connection_error() {
        assert!(matches!(
            MongoStore::connect("not-a-mongo-uri"),
            Err(PipelineError::Connection(_))
        ));
    }
}
