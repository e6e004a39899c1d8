//! Stage factory.
//!
//! A registry maps stage names to constructor functions. Constructors get
//! the stage's pipeline position along with its options, because several
//! stages mean different things at position 0: `tcp` listens there and
//! connects everywhere else, `file` reads there and appends everywhere else.
//! The registry is initialised once and can be extended at runtime with
//! [`register_stage`].

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::codecs::{
    self, DelimDecode, DelimEncode, EscapeNewlines, JsonToXml, LengthDecode, LengthEncode,
    LogStage, NullCodec, SkipCodec, StripCodec, UnescapeNewlines, UrlDecode, UrlEncode, XmlToJson,
};
use crate::config::{self, StageToken};
use crate::engine::Stage;
use crate::error::{ProxyError, Result};
use crate::transports::{
    FileSink, FileSource, FolderSink, FolderSource, StdinSource, StdoutSink, TcpSink, TcpSource,
    UdpSink, UdpSource, ZmqMode, ZmqSink, ZmqSource,
};

/// A stage constructor takes the stage's pipeline position and its raw
/// options and returns a configured stage, or `InvalidOption`.
type StageConstructor = Box<dyn Fn(usize, Option<&str>) -> Result<Box<dyn Stage>> + Send + Sync>;

static STAGE_REGISTRY: OnceLock<Mutex<HashMap<String, StageConstructor>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, StageConstructor>> {
    STAGE_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Register a stage constructor, replacing any previous one of the same name.
pub fn register_stage(name: &str, constructor: StageConstructor) {
    let mut registry = registry().lock().unwrap();
    registry.insert(name.to_string(), constructor);
}

/// Names of all registered stage types, sorted for display.
pub fn list_stages() -> Vec<String> {
    ensure_default_stages();

    let registry = registry().lock().unwrap();
    let mut names: Vec<String> = registry.keys().cloned().collect();
    names.sort();
    names
}

pub fn stage_exists(name: &str) -> bool {
    ensure_default_stages();

    let registry = registry().lock().unwrap();
    registry.contains_key(name)
}

/// Create the stage a token names, configured for its pipeline position.
pub fn create_stage(token: &StageToken, position: usize) -> Result<Box<dyn Stage>> {
    tracing::debug!("creating stage '{}' at position {}", token.name, position);

    ensure_default_stages();

    let registry = registry().lock().unwrap();
    let constructor = registry.get(&token.name).ok_or_else(|| {
        ProxyError::InvalidOption(format!("unknown stage type '{}'", token.name))
    })?;
    constructor(position, token.options.as_deref())
}

fn ensure_default_stages() {
    static INITIALIZED: OnceLock<()> = OnceLock::new();
    INITIALIZED.get_or_init(|| {
        register_stage("tcp", Box::new(tcp_stage));
        register_stage("udp", Box::new(udp_stage));
        register_stage("-", Box::new(std_stage));
        register_stage("std", Box::new(std_stage));
        register_stage("file", Box::new(file_stage));
        register_stage("folder", Box::new(folder_stage));
        register_stage("zmq", Box::new(zmq_stage));
        register_stage("log", Box::new(log_stage));
        register_stage("null", Box::new(null_stage));
        register_stage("skip", Box::new(skip_stage));
        register_stage("strip", Box::new(strip_stage));
        register_stage("+length", Box::new(length_encode_stage));
        register_stage("-length", Box::new(length_decode_stage));
        register_stage("+delim", Box::new(delim_encode_stage));
        register_stage("-delim", Box::new(delim_decode_stage));
        register_stage("+lines", Box::new(lines_encode_stage));
        register_stage("-lines", Box::new(lines_decode_stage));
        register_stage("+url", Box::new(url_encode_stage));
        register_stage("-url", Box::new(url_decode_stage));
        register_stage("+n", Box::new(escape_stage));
        register_stage("-n", Box::new(unescape_stage));
        register_stage("xml-json", Box::new(xml_to_json_stage));
        register_stage("json-xml", Box::new(json_to_xml_stage));

        tracing::debug!("default stages registered");
    });
}

fn required<'a>(name: &str, options: Option<&'a str>) -> Result<&'a str> {
    options.ok_or_else(|| ProxyError::InvalidOption(format!("'{name}' requires options")))
}

fn no_options(name: &str, options: Option<&str>) -> Result<()> {
    match options {
        None => Ok(()),
        Some(options) => Err(ProxyError::InvalidOption(format!(
            "'{name}' takes no options, got '{options}'"
        ))),
    }
}

fn not_a_source(name: &str, position: usize) -> Result<()> {
    if position == 0 {
        return Err(ProxyError::InvalidOption(format!(
            "'{name}' cannot be the pipeline source"
        )));
    }
    Ok(())
}

fn tcp_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    let (addr, suffix) = config::parse_addr(required("tcp", options)?)?;
    match (position, suffix.as_deref()) {
        (0, None) => Ok(Box::new(TcpSource::new(addr, false))),
        (0, Some("keep")) => Ok(Box::new(TcpSource::new(addr, true))),
        (_, None) => Ok(Box::new(TcpSink::new(addr))),
        (_, Some(suffix)) => Err(ProxyError::InvalidOption(format!(
            "unexpected tcp option suffix '{suffix}'"
        ))),
    }
}

fn udp_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    let (addr, suffix) = config::parse_addr(required("udp", options)?)?;
    if let Some(suffix) = suffix {
        return Err(ProxyError::InvalidOption(format!(
            "unexpected udp option suffix '{suffix}'"
        )));
    }
    if position == 0 {
        Ok(Box::new(UdpSource::new(addr)))
    } else {
        Ok(Box::new(UdpSink::new(addr)))
    }
}

fn std_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    no_options("std", options)?;
    if position == 0 {
        Ok(Box::new(StdinSource::new()))
    } else {
        Ok(Box::new(StdoutSink::new()))
    }
}

fn file_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    let path = required("file", options)?;
    if position == 0 {
        Ok(Box::new(FileSource::new(path)))
    } else {
        Ok(Box::new(FileSink::new(path)))
    }
}

fn folder_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    let path = required("folder", options)?;
    if position == 0 {
        Ok(Box::new(FolderSource::new(path)))
    } else {
        Ok(Box::new(FolderSink::new(path)))
    }
}

fn zmq_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    let options = required("zmq", options)?;
    let (mode, address) = options.split_once(':').ok_or_else(|| {
        ProxyError::InvalidOption(format!("zmq expects MODE:address, got '{options}'"))
    })?;
    let mode: ZmqMode = mode.parse()?;

    // Accept a full zmq endpoint verbatim, or the shared ipv4:port shape.
    let endpoint = if address.contains("://") {
        address.to_string()
    } else {
        let (addr, suffix) = config::parse_addr(address)?;
        if let Some(suffix) = suffix {
            return Err(ProxyError::InvalidOption(format!(
                "unexpected zmq option suffix '{suffix}'"
            )));
        }
        format!("tcp://{addr}")
    };

    match (mode.is_source(), position) {
        (true, 0) => Ok(Box::new(ZmqSource::new(mode, endpoint))),
        (false, position) if position > 0 => Ok(Box::new(ZmqSink::new(mode, endpoint))),
        (true, _) => Err(ProxyError::InvalidOption(format!(
            "zmq mode {mode:?} receives and must be the pipeline source"
        ))),
        (false, _) => Err(ProxyError::InvalidOption(format!(
            "zmq mode {mode:?} sends and cannot be the pipeline source"
        ))),
    }
}

fn log_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("log", position)?;
    Ok(Box::new(LogStage::new(options)))
}

fn null_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("null", position)?;
    no_options("null", options)?;
    Ok(codecs::as_encoder("null", NullCodec))
}

fn skip_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("skip", position)?;
    let count: i64 = required("skip", options)?.parse().map_err(|_| {
        ProxyError::InvalidOption("'skip' requires an integer byte count".to_string())
    })?;
    Ok(codecs::as_encoder("skip", SkipCodec::new(count)))
}

fn strip_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("strip", position)?;
    no_options("strip", options)?;
    Ok(codecs::as_encoder("strip", StripCodec))
}

fn length_encode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("+length", position)?;
    no_options("+length", options)?;
    Ok(codecs::as_encoder("+length", LengthEncode))
}

fn length_decode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("-length", position)?;
    no_options("-length", options)?;
    Ok(codecs::as_decoder("-length", LengthDecode))
}

fn delimiter(name: &str, options: Option<&str>) -> Result<Vec<u8>> {
    let delimiter = required(name, options)?;
    if delimiter.is_empty() {
        return Err(ProxyError::InvalidOption(format!(
            "'{name}' requires a non-empty delimiter"
        )));
    }
    // The delimiter is taken verbatim, byte for byte; no escape processing.
    Ok(delimiter.as_bytes().to_vec())
}

fn delim_encode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("+delim", position)?;
    Ok(codecs::as_encoder(
        "+delim",
        DelimEncode::new(delimiter("+delim", options)?),
    ))
}

fn delim_decode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("-delim", position)?;
    Ok(codecs::as_decoder(
        "-delim",
        DelimDecode::new(delimiter("-delim", options)?),
    ))
}

fn lines_encode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("+lines", position)?;
    no_options("+lines", options)?;
    Ok(codecs::as_encoder("+lines", DelimEncode::new(*b"\n")))
}

fn lines_decode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("-lines", position)?;
    no_options("-lines", options)?;
    Ok(codecs::as_decoder("-lines", DelimDecode::new(*b"\n")))
}

fn url_encode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("+url", position)?;
    no_options("+url", options)?;
    Ok(codecs::as_encoder("+url", UrlEncode))
}

fn url_decode_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("-url", position)?;
    no_options("-url", options)?;
    Ok(codecs::as_encoder("-url", UrlDecode))
}

fn escape_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("+n", position)?;
    no_options("+n", options)?;
    Ok(codecs::as_encoder("+n", EscapeNewlines))
}

fn unescape_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("-n", position)?;
    no_options("-n", options)?;
    Ok(codecs::as_encoder("-n", UnescapeNewlines))
}

fn xml_to_json_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("xml-json", position)?;
    no_options("xml-json", options)?;
    Ok(codecs::as_encoder("xml-json", XmlToJson))
}

fn json_to_xml_stage(position: usize, options: Option<&str>) -> Result<Box<dyn Stage>> {
    not_a_source("json-xml", position)?;
    no_options("json-xml", options)?;
    Ok(codecs::as_encoder("json-xml", JsonToXml))
}
