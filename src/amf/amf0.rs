/// AMF0 values understood by the publisher.
///
/// Commands are only ever built from `String`, `Number` and `Object`.
/// `Boolean` and `Null` show up in server responses and are decoded so the
/// reader can step over them, but command encoding refuses them.
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),          // 0x00
    Boolean(bool),        // 0x01
    String(String),       // 0x02
    Object(Amf0Object),   // 0x03 (and 0x08 when decoding)
    Null,                 // 0x05 (and 0x06 when decoding)
}

// AMF0 type markers
pub mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;

    /// Empty key followed by OBJECT_END, closing every object
    pub const OBJECT_END_SEQUENCE: [u8; 3] = [0x00, 0x00, OBJECT_END];
}

impl Amf0Value {
    /// Extract number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string reference
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract object reference
    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get property from object
    pub fn get_property(&self, key: &str) -> Option<&Amf0Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Amf0Value::Number(_) => "number",
            Amf0Value::Boolean(_) => "boolean",
            Amf0Value::String(_) => "string",
            Amf0Value::Object(_) => "object",
            Amf0Value::Null => "null",
        }
    }
}

impl From<&str> for Amf0Value {
    fn from(value: &str) -> Self {
        Amf0Value::String(value.to_string())
    }
}

impl From<String> for Amf0Value {
    fn from(value: String) -> Self {
        Amf0Value::String(value)
    }
}

impl From<f64> for Amf0Value {
    fn from(value: f64) -> Self {
        Amf0Value::Number(value)
    }
}

/// AMF0 object properties, kept in insertion order so the encoded bytes
/// follow the order the caller built the object in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Amf0Object {
    entries: Vec<(String, Amf0Value)>,
}

impl Amf0Object {
    pub fn new() -> Self {
        Amf0Object { entries: Vec::new() }
    }

    /// Insert a property. An existing key keeps its position and gets the
    /// new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Amf0Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Amf0Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Amf0Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Amf0Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_keeps_insertion_order() {
        let obj = Amf0Object::new()
            .with("app", "live")
            .with("type", "nonprivate")
            .with("flashVer", "LNX 9,0,124,2");

        let keys: Vec<&str> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["app", "type", "flashVer"]);
    }

    #[test]
    fn test_object_replace_keeps_position() {
        let mut obj = Amf0Object::new().with("a", 1.0).with("b", 2.0);
        obj.insert("a", 3.0);

        assert_eq!(obj.len(), 2);
        assert_eq!(obj.iter().next(), Some(("a", &Amf0Value::Number(3.0))));
    }

    #[test]
    fn test_property_access() {
        let value = Amf0Value::Object(Amf0Object::new().with("code", "NetConnection.Connect.Success"));
        assert_eq!(
            value.get_property("code").and_then(|v| v.as_string()),
            Some("NetConnection.Connect.Success")
        );
        assert!(value.get_property("level").is_none());
    }
}
