//! Domain records for exercising the store.
//!
//! `NetworkRecord` and `EndpointRecord` behave like real network objects:
//! CBOR-encoded content, a constructor for enumeration, and an opt-in
//! skip-persistence flag. `OpaqueRecord` carries raw bytes and deliberately
//! has no constructor.

use std::collections::BTreeMap;

use netkv_core::{
    KeyPath, KvConstructor, KvObject, ObjectError, Scope, ENDPOINT_KEY_PREFIX, NETWORK_KEY_PREFIX,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

fn encode<T: Serialize>(body: &T) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(body, &mut buf).ok()?;
    Some(buf)
}

fn decode<T: DeserializeOwned>(value: &[u8]) -> netkv_core::Result<T> {
    ciborium::from_reader(value).map_err(|e| ObjectError::Deserialization(e.to_string()))
}

/// Persisted content of a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct NetworkBody {
    name: String,
    driver: String,
    labels: BTreeMap<String, String>,
}

/// A network, keyed `network/<name>`.
#[derive(Debug, Clone, Default)]
pub struct NetworkRecord {
    pub name: String,
    pub driver: String,
    pub labels: BTreeMap<String, String>,
    index: u64,
    exists: bool,
    skip: bool,
    scope: Scope,
}

impl NetworkRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: "bridge".into(),
            ..Default::default()
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Keep this record in the cache only.
    pub fn skip_persist(mut self) -> Self {
        self.skip = true;
        self
    }

    fn body(&self) -> NetworkBody {
        NetworkBody {
            name: self.name.clone(),
            driver: self.driver.clone(),
            labels: self.labels.clone(),
        }
    }
}

impl KvObject for NetworkRecord {
    fn key(&self) -> KeyPath {
        KeyPath::new([NETWORK_KEY_PREFIX, self.name.as_str()])
    }

    fn key_prefix(&self) -> KeyPath {
        KeyPath::new([NETWORK_KEY_PREFIX])
    }

    fn value(&self) -> Option<Vec<u8>> {
        encode(&self.body())
    }

    fn set_value(&mut self, value: &[u8]) -> netkv_core::Result<()> {
        let body: NetworkBody = decode(value)?;
        self.name = body.name;
        self.driver = body.driver;
        self.labels = body.labels;
        Ok(())
    }

    fn index(&self) -> u64 {
        self.index
    }

    fn set_index(&mut self, index: u64) {
        self.index = index;
        self.exists = true;
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn data_scope(&self) -> Scope {
        self.scope
    }

    fn skip(&self) -> bool {
        self.skip
    }

    fn constructor(&self) -> Option<&dyn KvConstructor> {
        Some(self)
    }
}

impl KvConstructor for NetworkRecord {
    fn new_object(&self) -> Box<dyn KvObject> {
        Box::new(NetworkRecord {
            scope: self.scope,
            ..Default::default()
        })
    }

    fn copy_to(&self, dst: &mut dyn KvObject) -> netkv_core::Result<()> {
        let value = self
            .value()
            .ok_or_else(|| ObjectError::Serialization(format!("network {}", self.name)))?;
        dst.set_value(&value)?;
        dst.set_index(self.index);
        Ok(())
    }
}

/// Persisted content of an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct EndpointBody {
    network: String,
    name: String,
    address: Option<String>,
}

/// An endpoint, keyed `endpoint/<network>/<name>`.
#[derive(Debug, Clone, Default)]
pub struct EndpointRecord {
    pub network: String,
    pub name: String,
    pub address: Option<String>,
    index: u64,
    exists: bool,
    skip: bool,
}

impl EndpointRecord {
    pub fn new(network: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn skip_persist(mut self) -> Self {
        self.skip = true;
        self
    }
}

impl KvObject for EndpointRecord {
    fn key(&self) -> KeyPath {
        KeyPath::new([ENDPOINT_KEY_PREFIX, self.network.as_str(), self.name.as_str()])
    }

    fn key_prefix(&self) -> KeyPath {
        KeyPath::new([ENDPOINT_KEY_PREFIX, self.network.as_str()])
    }

    fn value(&self) -> Option<Vec<u8>> {
        encode(&EndpointBody {
            network: self.network.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
        })
    }

    fn set_value(&mut self, value: &[u8]) -> netkv_core::Result<()> {
        let body: EndpointBody = decode(value)?;
        self.network = body.network;
        self.name = body.name;
        self.address = body.address;
        Ok(())
    }

    fn index(&self) -> u64 {
        self.index
    }

    fn set_index(&mut self, index: u64) {
        self.index = index;
        self.exists = true;
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn data_scope(&self) -> Scope {
        Scope::Local
    }

    fn skip(&self) -> bool {
        self.skip
    }

    fn constructor(&self) -> Option<&dyn KvConstructor> {
        Some(self)
    }
}

impl KvConstructor for EndpointRecord {
    fn new_object(&self) -> Box<dyn KvObject> {
        // Enumeration keys on the parent network, so the exemplar's network carries over
        Box::new(EndpointRecord {
            network: self.network.clone(),
            ..Default::default()
        })
    }

    fn copy_to(&self, dst: &mut dyn KvObject) -> netkv_core::Result<()> {
        let value = self
            .value()
            .ok_or_else(|| ObjectError::Serialization(format!("endpoint {}", self.name)))?;
        dst.set_value(&value)?;
        dst.set_index(self.index);
        Ok(())
    }
}

/// Raw bytes under an arbitrary key. Cannot be enumerated.
#[derive(Debug, Clone)]
pub struct OpaqueRecord {
    segments: Vec<String>,
    pub value: Option<Vec<u8>>,
    index: u64,
    exists: bool,
}

impl OpaqueRecord {
    pub fn new<I, S>(segments: I, value: Option<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            value,
            index: 0,
            exists: false,
        }
    }
}

impl KvObject for OpaqueRecord {
    fn key(&self) -> KeyPath {
        KeyPath::from(self.segments.clone())
    }

    fn value(&self) -> Option<Vec<u8>> {
        self.value.clone()
    }

    fn set_value(&mut self, value: &[u8]) -> netkv_core::Result<()> {
        self.value = Some(value.to_vec());
        Ok(())
    }

    fn index(&self) -> u64 {
        self.index
    }

    fn set_index(&mut self, index: u64) {
        self.index = index;
        self.exists = true;
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn data_scope(&self) -> Scope {
        Scope::Local
    }

    fn skip(&self) -> bool {
        false
    }
}
