//! JSON protocol spoken with display driver binaries over stdin/stdout.
//!
//! Each request line is answered by one response line:
//! `{"command":"render","params":{...}}` answered by
//! `{"status":"success","data":null}` or `{"status":"error","error":"..."}`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub trait DriverCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Init,
    Clear,
    Render,
    Sleep,
}

/// Request sent from inkday to the driver.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from the driver to inkday.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

/// Wake the panel and prepare it for drawing.
#[derive(Debug, Serialize, Deserialize)]
pub struct Init {}

impl DriverCommand for Init {
    type Response = ();
    fn command() -> Command {
        Command::Init
    }
}

/// Blank the panel.
#[derive(Debug, Serialize, Deserialize)]
pub struct Clear {}

impl DriverCommand for Clear {
    type Response = ();
    fn command() -> Command {
        Command::Clear
    }
}

/// Show the PNG frame at `path`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Render {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

impl DriverCommand for Render {
    type Response = ();
    fn command() -> Command {
        Command::Render
    }
}

/// Put the panel into deep sleep. The image stays visible.
#[derive(Debug, Serialize, Deserialize)]
pub struct Sleep {}

impl DriverCommand for Sleep {
    type Response = ();
    fn command() -> Command {
        Command::Sleep
    }
}
