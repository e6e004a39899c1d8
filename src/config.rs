//! Stage-token and address parsing.
//!
//! The pipeline configuration is the ordered CLI token list. Each token is
//! `name` or `name:options`; what `options` means is up to the stage factory,
//! but the address shape `[//]<ipv4>:<port>` is shared by several transports
//! and parsed here.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::{ProxyError, Result};

/// One parsed CLI token, not yet bound to a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageToken {
    pub name: String,
    pub options: Option<String>,
}

/// Split a token into stage name and options at the first `:`.
pub fn parse_token(token: &str) -> Result<StageToken> {
    let (name, options) = match token.split_once(':') {
        Some((name, options)) => (name, Some(options.to_string())),
        None => (token, None),
    };
    if name.is_empty() {
        return Err(ProxyError::InvalidOption(format!(
            "empty stage name in token '{token}'"
        )));
    }
    Ok(StageToken {
        name: name.to_string(),
        options,
    })
}

/// Parse `[//]<ipv4>:<port>` and return the address plus any `:`-separated
/// trailing suffix (e.g. the `keep` flag on a tcp source).
pub fn parse_addr(options: &str) -> Result<(SocketAddr, Option<String>)> {
    let trimmed = options.strip_prefix("//").unwrap_or(options);

    let (host, rest) = trimmed.split_once(':').ok_or_else(|| {
        ProxyError::InvalidOption(format!("expected <ipv4>:<port>, got '{options}'"))
    })?;
    let (port, suffix) = match rest.split_once(':') {
        Some((port, suffix)) => (port, Some(suffix.to_string())),
        None => (rest, None),
    };

    let host: Ipv4Addr = host.parse().map_err(|_| {
        ProxyError::InvalidOption(format!("'{host}' is not a dotted IPv4 address"))
    })?;
    let port: u16 = port
        .parse()
        .map_err(|_| ProxyError::InvalidOption(format!("'{port}' is not a valid port")))?;

    Ok((SocketAddr::V4(SocketAddrV4::new(host, port)), suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_without_options() {
        let token = parse_token("null").unwrap();
        assert_eq!(token.name, "null");
        assert_eq!(token.options, None);
    }

    #[test]
    fn test_token_splits_on_first_colon_only() {
        let token = parse_token("tcp:0.0.0.0:9000").unwrap();
        assert_eq!(token.name, "tcp");
        assert_eq!(token.options.as_deref(), Some("0.0.0.0:9000"));
    }

    #[test]
    fn test_token_with_empty_name_is_rejected() {
        assert!(matches!(
            parse_token(":oops"),
            Err(ProxyError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_delimiter_options_are_taken_verbatim() {
        let token = parse_token("+delim:|").unwrap();
        assert_eq!(token.options.as_deref(), Some("|"));
    }

    #[test]
    fn test_addr_plain() {
        let (addr, suffix) = parse_addr("10.0.0.1:9000").unwrap();
        assert_eq!(addr.to_string(), "10.0.0.1:9000");
        assert_eq!(suffix, None);
    }

    #[test]
    fn test_addr_with_leading_slashes() {
        let (addr, _) = parse_addr("//127.0.0.1:7000").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:7000");
    }

    #[test]
    fn test_addr_with_suffix() {
        let (addr, suffix) = parse_addr("0.0.0.0:9000:keep").unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:9000");
        assert_eq!(suffix.as_deref(), Some("keep"));
    }

    #[test]
    fn test_addr_rejects_hostnames() {
        assert!(matches!(
            parse_addr("localhost:9000"),
            Err(ProxyError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_addr_rejects_bad_port() {
        assert!(matches!(
            parse_addr("127.0.0.1:65536"),
            Err(ProxyError::InvalidOption(_))
        ));
    }
}
