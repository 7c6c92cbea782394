// Message types
pub const MSG_TYPE_SET_CHUNK_SIZE: u8 = 1;
pub const MSG_TYPE_ABORT: u8 = 2;
pub const MSG_TYPE_ACK: u8 = 3;
pub const MSG_TYPE_USER_CONTROL: u8 = 4;         // User control messages
pub const MSG_TYPE_WINDOW_ACK: u8 = 5;
pub const MSG_TYPE_SET_PEER_BW: u8 = 6;
pub const MSG_TYPE_AUDIO: u8 = 8;
pub const MSG_TYPE_VIDEO: u8 = 9;
pub const MSG_TYPE_DATA_AMF0: u8 = 18;
pub const MSG_TYPE_COMMAND_AMF3: u8 = 17;
pub const MSG_TYPE_COMMAND_AMF0: u8 = 20;

// Chunk stream IDs
pub const CHUNK_STREAM_PROTOCOL: u32 = 2;
pub const CHUNK_STREAM_COMMAND: u32 = 3;
pub const CHUNK_STREAM_VIDEO: u32 = 6;

// Message stream IDs
pub const CONTROL_MESSAGE_STREAM_ID: u32 = 0;
pub const COMMAND_MESSAGE_STREAM_ID: u32 = 1;

// Default values
pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const DEFAULT_WINDOW_SIZE: u32 = 2500000;
pub const DEFAULT_PORT: u16 = 1935;
pub const DEFAULT_FLASH_VER: &str = "LNX 9,0,124,2";
pub const DEFAULT_CONNECTION_TYPE: &str = "nonprivate";

// Command names
pub const CMD_CONNECT: &str = "connect";
pub const CMD_CREATE_STREAM: &str = "createStream";
pub const CMD_RESULT: &str = "_result";
pub const CMD_ERROR: &str = "_error";

/// Human-readable name of a message type, for logs
pub fn message_type_name(message_type: u8) -> &'static str {
    match message_type {
        MSG_TYPE_SET_CHUNK_SIZE => "SetChunkSize",
        MSG_TYPE_ABORT => "Abort",
        MSG_TYPE_ACK => "Acknowledgement",
        MSG_TYPE_USER_CONTROL => "UserControl",
        MSG_TYPE_WINDOW_ACK => "WindowAcknowledgementSize",
        MSG_TYPE_SET_PEER_BW => "SetPeerBandwidth",
        MSG_TYPE_AUDIO => "Audio",
        MSG_TYPE_VIDEO => "Video",
        MSG_TYPE_DATA_AMF0 => "DataAmf0",
        MSG_TYPE_COMMAND_AMF3 => "CommandAmf3",
        MSG_TYPE_COMMAND_AMF0 => "CommandAmf0",
        _ => "Unknown",
    }
}
