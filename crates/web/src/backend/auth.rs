//! Auth API calls (`/auth/v1`).

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;
use url::Url;

use super::client::{CallKind, KeyKind};
use super::types::{AdminUsersPage, AuthIdentity, AuthSession, IdentityMetadata, SignUpResponse};
use super::{BackendClient, BackendError};
use crate::services::profiles::IdentityDirectory;

const ADMIN_PAGE_SIZE: usize = 1000;

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a IdentityMetadata,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

impl BackendClient {
    /// Register a new identity with the given metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the sign-up (e.g. the email
    /// is already registered or the password is too weak).
    #[instrument(skip(self, password, metadata))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &IdentityMetadata,
    ) -> Result<SignUpResponse, BackendError> {
        let url = self.url("auth/v1/signup", &[])?;
        let body = SignUpRequest {
            email,
            password,
            data: metadata,
        };
        self.send_json(CallKind::Write, || {
            self.request(Method::POST, url.clone(), KeyKind::Anon, None)
                .json(&body)
        })
        .await
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let url = self.url("auth/v1/token", &[("grant_type", "password")])?;
        let body = PasswordGrant { email, password };
        self.send_json(CallKind::Read, || {
            self.request(Method::POST, url.clone(), KeyKind::Anon, None)
                .json(&body)
        })
        .await
    }

    /// Exchange an OAuth authorization code and PKCE verifier for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is invalid, expired or already used.
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, BackendError> {
        let url = self.url("auth/v1/token", &[("grant_type", "pkce")])?;
        let body = PkceGrant {
            auth_code,
            code_verifier,
        };
        // Codes are single use; a retried exchange would always fail.
        self.send_json(CallKind::Write, || {
            self.request(Method::POST, url.clone(), KeyKind::Anon, None)
                .json(&body)
        })
        .await
    }

    /// URL the browser is sent to for an OAuth sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<Url, BackendError> {
        self.url(
            "auth/v1/authorize",
            &[
                ("provider", provider),
                ("redirect_to", redirect_to),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "s256"),
            ],
        )
    }

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.url("auth/v1/logout", &[])?;
        self.send(CallKind::Write, || {
            self.request(Method::POST, url.clone(), KeyKind::Anon, Some(access_token))
        })
        .await?;
        Ok(())
    }
}

impl IdentityDirectory for BackendClient {
    /// All identities, fetched page by page through the admin API.
    #[instrument(skip(self))]
    async fn list_identities(&self) -> Result<Vec<AuthIdentity>, BackendError> {
        let per_page = ADMIN_PAGE_SIZE.to_string();
        let mut identities = Vec::new();
        let mut page: usize = 1;

        loop {
            let page_str = page.to_string();
            let url = self.url(
                "auth/v1/admin/users",
                &[("page", page_str.as_str()), ("per_page", per_page.as_str())],
            )?;
            let batch: AdminUsersPage = self
                .send_json(CallKind::Read, || {
                    self.request(Method::GET, url.clone(), KeyKind::ServiceRole, None)
                })
                .await?;

            let fetched = batch.users.len();
            identities.extend(batch.users);
            if fetched < ADMIN_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        tracing::debug!(count = identities.len(), "Fetched auth identities");
        Ok(identities)
    }
}
