// MIT License - Copyright (c) 2021 TJForc
// Username/password prompt handshake run by the M1XEP on each new connection

use tracing::{debug, info, warn};

use crate::constants::{CRLF, LOGIN_SUCCESS, NOT_SET, PASSWORD_PROMPT, USERNAME_PROMPT};
use crate::credentials::Credentials;
use crate::error::{ElkError, Result};
use crate::transport::session::Session;

/// Authenticate a freshly opened session.
///
/// Credentials whose user and token are both `not-set` skip the handshake
/// entirely and nothing is written to the stream.
pub async fn login(session: &mut Session, credentials: &Credentials) -> Result<()> {
    if credentials.user == NOT_SET && credentials.token == NOT_SET {
        debug!("Credentials not set, skipping login");
        return Ok(());
    }

    let prompt = session.read_until(&[USERNAME_PROMPT, CRLF]).await?;
    if !prompt.ends_with(USERNAME_PROMPT.as_bytes()) {
        warn!("Panel did not prompt for a username");
        return Err(ElkError::LoginFailed { user: None });
    }
    session
        .send(format!("{}{}", credentials.user, CRLF).as_bytes())
        .await?;

    let prompt = session.read_until(&[PASSWORD_PROMPT, CRLF]).await?;
    if !prompt.ends_with(PASSWORD_PROMPT.as_bytes()) {
        warn!("Panel did not prompt for a password");
        return Err(ElkError::LoginFailed { user: None });
    }
    session
        .send_sensitive(format!("{}{}", credentials.token, CRLF).as_bytes())
        .await?;

    let reply = match session
        .read_until(&[LOGIN_SUCCESS, USERNAME_PROMPT, CRLF])
        .await
    {
        Ok(reply) => reply,
        Err(e) if e.is_eof() => {
            return Err(ElkError::LoginFailed {
                user: Some(credentials.user.clone()),
            });
        }
        Err(e) => return Err(e),
    };
    if !reply.ends_with(LOGIN_SUCCESS.as_bytes()) {
        warn!("Panel rejected login for {}", credentials.user);
        return Err(ElkError::LoginFailed { user: None });
    }

    info!("Logged in to panel as {}", credentials.user);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    fn creds(user: &str, token: &str) -> Credentials {
        Credentials {
            user: user.to_string(),
            token: token.to_string(),
        }
    }

    fn session() -> (Session, tokio::io::DuplexStream) {
        let (client, panel) = duplex(256);
        (Session::new(Box::new(client), Duration::from_secs(1)), panel)
    }

    #[tokio::test]
    async fn test_not_set_sends_nothing() {
        let (mut session, mut panel) = session();
        login(&mut session, &creds(NOT_SET, NOT_SET)).await.unwrap();
        drop(session);

        let mut sent = Vec::new();
        panel.read_to_end(&mut sent).await.unwrap();
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn test_successful_login() {
        let (mut session, mut panel) = session();
        panel
            .write_all(b"Username:Password:Elk-M1XEP: Login successful.")
            .await
            .unwrap();
        login(&mut session, &creds("installer", "1234")).await.unwrap();
        drop(session);

        let mut sent = Vec::new();
        panel.read_to_end(&mut sent).await.unwrap();
        assert_eq!(sent, b"installer\r\n1234\r\n");
    }

    #[tokio::test]
    async fn test_missing_username_prompt() {
        let (mut session, mut panel) = session();
        panel.write_all(b"Welcome\r\n").await.unwrap();
        let err = login(&mut session, &creds("installer", "1234"))
            .await
            .unwrap_err();
        assert!(matches!(err, ElkError::LoginFailed { user: None }));
    }

    #[tokio::test]
    async fn test_missing_password_prompt() {
        let (mut session, mut panel) = session();
        panel.write_all(b"Username:\r\n").await.unwrap();
        let err = login(&mut session, &creds("installer", "1234"))
            .await
            .unwrap_err();
        assert!(matches!(err, ElkError::LoginFailed { user: None }));
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let (mut session, mut panel) = session();
        panel
            .write_all(b"Username:Password:\r\nUsername:")
            .await
            .unwrap();
        let err = login(&mut session, &creds("installer", "bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, ElkError::LoginFailed { user: None }));
    }

    #[tokio::test]
    async fn test_eof_after_password() {
        let (mut session, mut panel) = session();
        panel.write_all(b"Username:Password:").await.unwrap();
        panel.shutdown().await.unwrap();
        let err = login(&mut session, &creds("installer", "1234"))
            .await
            .unwrap_err();
        match err {
            ElkError::LoginFailed { user } => assert_eq!(user.as_deref(), Some("installer")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
