//! Resolve IPs from hostnames.
//!
//! Java edition addresses without an explicit port go through the
//! `_minecraft._tcp` SRV record first, the way the vanilla client does.

use async_recursion::async_recursion;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use tracing::debug;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveError,
    TokioAsyncResolver,
};

use crate::server_address::ServerAddress;

/// SRV records may point at other SRV-bearing names; stop following after this.
const MAX_SRV_REDIRECTS: u8 = 4;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("No SRV record found")]
    NoSrvRecord,
    #[error("No IP found for {0}")]
    NoIp(String),
    #[error("Too many SRV redirects for {0}")]
    TooManyRedirects(String),
    #[error("Failed to build resolver: {0}")]
    Setup(#[from] ResolveError),
}

#[derive(Clone)]
pub struct Resolver {
    inner: TokioAsyncResolver,
}

impl Resolver {
    pub fn new() -> Result<Self, ResolverError> {
        // Cloudflare instead of the system resolver: trust_dns_resolver is
        // really slow with the default resolver on Windows
        let inner = TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), ResolverOpts::default())?;
        Ok(Resolver { inner })
    }

    /// Resolve a Java edition address into a socket address, following SRV
    /// records when the address carries no port. If the host is already an
    /// IP address, it's returned as-is.
    pub async fn resolve_java(&self, address: &ServerAddress) -> Result<SocketAddr, ResolverError> {
        if let Some(addr) = address.socket_addr(address.java_port()) {
            return Ok(addr);
        }
        if address.port.is_some() {
            let ip = self.lookup_ip(&address.host).await?;
            return Ok(SocketAddr::new(ip, address.java_port()));
        }
        self.resolve_srv(&address.host, address.java_port(), 0).await
    }

    /// Resolve a Bedrock edition address. Bedrock has no SRV convention.
    pub async fn resolve_bedrock(&self, address: &ServerAddress) -> Result<SocketAddr, ResolverError> {
        let port = address.bedrock_port();
        if let Some(addr) = address.socket_addr(port) {
            return Ok(addr);
        }
        let ip = self.lookup_ip(&address.host).await?;
        Ok(SocketAddr::new(ip, port))
    }

    #[async_recursion]
    async fn resolve_srv(
        &self,
        host: &str,
        default_port: u16,
        depth: u8,
    ) -> Result<SocketAddr, ResolverError> {
        if depth > MAX_SRV_REDIRECTS {
            return Err(ResolverError::TooManyRedirects(host.to_string()));
        }

        // first, we do a srv lookup for _minecraft._tcp.<host>
        let srv_redirect_result = self
            .inner
            .srv_lookup(format!("_minecraft._tcp.{host}").as_str())
            .await;

        // if it resolves that means it's a redirect
        if let Ok(redirect_result) = srv_redirect_result {
            let redirect_srv = redirect_result
                .iter()
                .next()
                .ok_or(ResolverError::NoSrvRecord)?;
            let target = redirect_srv.target().to_utf8();
            let target = target.trim_end_matches('.');
            let port = redirect_srv.port();

            debug!(host, target, port, "following SRV redirect");

            if target.eq_ignore_ascii_case(host) {
                let ip = self.lookup_ip(target).await?;
                return Ok(SocketAddr::new(ip, port));
            }
            return self.resolve_srv(target, port, depth + 1).await;
        }

        // there's no redirect, try to resolve this as an ip address
        let ip = self.lookup_ip(host).await?;
        Ok(SocketAddr::new(ip, default_port))
    }

    async fn lookup_ip(&self, host: &str) -> Result<IpAddr, ResolverError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        let lookup = self
            .inner
            .lookup_ip(host)
            .await
            .map_err(|_| ResolverError::NoIp(host.to_string()))?;
        lookup
            .iter()
            .next()
            .ok_or_else(|| ResolverError::NoIp(host.to_string()))
    }
}
