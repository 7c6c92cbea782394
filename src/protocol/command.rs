use crate::amf::{encode_command, Amf0Object};
use crate::protocol::constants::*;
use crate::Result;

/// A command message sent on the command chunk stream
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub transaction_id: u32,
    pub params: Amf0Object,
}

impl Command {
    /// Create new command
    pub fn new(name: impl Into<String>, transaction_id: u32, params: Amf0Object) -> Self {
        Command {
            name: name.into(),
            transaction_id,
            params,
        }
    }

    /// Create connect command
    pub fn connect(transaction_id: u32, params: &ConnectParams) -> Self {
        let obj = Amf0Object::new()
            .with("app", params.app.as_str())
            .with("type", params.connection_type.as_str())
            .with("flashVer", params.flash_ver.as_str())
            .with("tcUrl", params.tc_url.as_str());

        Command::new(CMD_CONNECT, transaction_id, obj)
    }

    /// Create createStream command
    pub fn create_stream(transaction_id: u32) -> Self {
        Command::new(CMD_CREATE_STREAM, transaction_id, Amf0Object::new())
    }

    /// Encode command to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_command(&self.name, self.transaction_id, &self.params)
    }
}

/// Properties of the `connect` command object
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectParams {
    pub app: String,
    pub connection_type: String,
    pub flash_ver: String,
    pub tc_url: String,
}

/// Hands out transaction ids for one connection, starting at 1
#[derive(Debug)]
pub struct TransactionIds {
    next: u32,
}

impl TransactionIds {
    pub fn new() -> Self {
        TransactionIds { next: 1 }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::{decode_command_head, Amf0Value};

    fn params() -> ConnectParams {
        ConnectParams {
            app: "live".to_string(),
            connection_type: DEFAULT_CONNECTION_TYPE.to_string(),
            flash_ver: DEFAULT_FLASH_VER.to_string(),
            tc_url: "rtmp://localhost/live".to_string(),
        }
    }

    #[test]
    fn test_connect_command() {
        let cmd = Command::connect(1, &params());
        assert_eq!(cmd.name, "connect");
        assert_eq!(cmd.transaction_id, 1);

        let keys: Vec<&str> = cmd.params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["app", "type", "flashVer", "tcUrl"]);
        assert_eq!(cmd.params.get("app"), Some(&Amf0Value::String("live".into())));
    }

    #[test]
    fn test_create_stream_encodes_head() {
        let bytes = Command::create_stream(2).encode().unwrap();
        let head = decode_command_head(&bytes).unwrap();

        assert_eq!(head.name, CMD_CREATE_STREAM);
        assert_eq!(head.transaction_id, 2.0);
    }

    #[test]
    fn test_transaction_ids_increase() {
        let mut ids = TransactionIds::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
    }
}
