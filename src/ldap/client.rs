//! [`DirectoryConnector`] over the synchronous `ldap3` client.
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use ldap3::{LdapConn, LdapConnSettings, LdapError, Scope, SearchEntry, SearchOptions, SearchResult};
use log::debug;

use super::{DirectoryConnector, DirectoryEndpoint, DirectoryObject, DirectorySession, WILDCARD_FILTER};
use crate::error::NetworkError;

/// sizeLimitExceeded: the server stopped early, the entries it sent are valid.
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct Ldap3Connector;

impl DirectoryConnector for Ldap3Connector {
    fn bind_anonymous(
        &self,
        address: IpAddr,
        endpoint: &DirectoryEndpoint,
        timeout: Duration,
    ) -> Result<Box<dyn DirectorySession>, NetworkError> {
        let scheme = if endpoint.secure { "ldaps" } else { "ldap" };
        let url = format!("{}://{}", scheme, SocketAddr::new(address, endpoint.port));
        // exercise targets present self-signed certificates
        let settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_no_tls_verify(true);
        let mut conn = LdapConn::with_settings(settings, &url)
            .map_err(|e| NetworkError::Transport(format!("{}: {}", url, e)))?;
        conn.with_timeout(timeout)
            .simple_bind("", "")
            .map_err(|e| NetworkError::Transport(format!("{}: {}", url, e)))?
            .success()
            .map_err(|e| NetworkError::Auth(e.to_string()))?;
        debug!("anonymous bind to {} accepted", url);
        Ok(Box::new(Ldap3Session { conn, timeout }))
    }
}

struct Ldap3Session {
    conn: LdapConn,
    timeout: Duration,
}

fn protocol(e: LdapError) -> NetworkError {
    NetworkError::Protocol(e.to_string())
}

impl DirectorySession for Ldap3Session {
    fn naming_contexts(&mut self) -> Result<Vec<String>, NetworkError> {
        let SearchResult(entries, _) = self
            .conn
            .with_timeout(self.timeout)
            .search("", Scope::Base, WILDCARD_FILTER, vec!["namingContexts"])
            .map_err(protocol)?;
        Ok(entries
            .into_iter()
            .filter(|e| !e.is_ref())
            .map(SearchEntry::construct)
            .flat_map(|e| values(&e.attrs, "namingContexts"))
            .collect())
    }

    fn search_subtree(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
        size_limit: usize,
    ) -> Result<Vec<DirectoryObject>, NetworkError> {
        let limit = i32::try_from(size_limit).unwrap_or(i32::MAX);
        let SearchResult(entries, result) = self
            .conn
            .with_search_options(SearchOptions::new().sizelimit(limit))
            .with_timeout(self.timeout)
            .search(base, Scope::Subtree, filter, attributes.to_vec())
            .map_err(protocol)?;
        match result.rc {
            0 => {}
            RC_SIZE_LIMIT_EXCEEDED => {
                debug!("size limit of {} reached under {}", size_limit, base)
            }
            rc => {
                return Err(NetworkError::Protocol(format!(
                    "search under {} returned rc={} {}",
                    base, rc, result.text
                )));
            }
        }
        Ok(entries
            .into_iter()
            .filter(|e| !e.is_ref())
            .map(SearchEntry::construct)
            .map(to_object)
            .collect())
    }

    fn unbind(&mut self) -> Result<(), NetworkError> {
        self.conn.unbind().map_err(protocol)
    }
}

/// Attribute values by case-insensitive name.
fn values(attrs: &HashMap<String, Vec<String>>, name: &str) -> Vec<String> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

fn first(attrs: &HashMap<String, Vec<String>>, name: &str) -> Option<String> {
    values(attrs, name).into_iter().next()
}

fn to_object(entry: SearchEntry) -> DirectoryObject {
    let attrs = &entry.attrs;
    DirectoryObject {
        dn: first(attrs, "distinguishedName").unwrap_or_else(|| entry.dn.clone()),
        object_classes: values(attrs, "objectClass"),
        name: first(attrs, "name"),
        account_name: first(attrs, "sAMAccountName"),
        principal_name: first(attrs, "userPrincipalName"),
        description: first(attrs, "description"),
        member_of: values(attrs, "memberOf"),
    }
}
