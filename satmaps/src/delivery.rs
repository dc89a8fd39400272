/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! delivery collaborator seam: hand the packaged artifact to the recipient list. The SMTP
//! implementation sends it as a mail attachment with the run log as message body.

use std::{fs, path::Path, time::Duration};
use async_trait::async_trait;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::warn;

use crate::errors::{Result, SatmapsError, config_error};

#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct SmtpConfig {
    pub smtp_uri: String,
    pub username: String,
    pub pw: String,
    pub sender: String,
    pub timeout: Duration,
}

/// the narrow contract of the notification collaborator
#[async_trait]
pub trait ArtifactSender {
    async fn send_artifact (&self, recipients: &[String], subject: &str, body: &str, attachment: &Path) -> Result<()>;
}

pub struct SmtpArtifactSender {
    config: SmtpConfig,
    from_addr: Mailbox,
}

impl SmtpArtifactSender {
    pub fn new (config: SmtpConfig) -> Result<Self> {
        // resolve the sender address upfront - no point starting a run with unusable credentials
        let from_addr = config.sender.parse::<Mailbox>()
            .map_err( |e| config_error( format!("invalid smtp sender address '{}': {e}", config.sender)))?;
        Ok( SmtpArtifactSender{ config, from_addr } )
    }
}

#[async_trait]
impl ArtifactSender for SmtpArtifactSender {
    async fn send_artifact (&self, recipients: &[String], subject: &str, body: &str, attachment: &Path) -> Result<()> {
        let config = &self.config;
        if recipients.is_empty() { warn!("no delivery recipients configured") }

        let creds = Credentials::new( config.username.clone(), config.pw.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay( config.smtp_uri.as_str())
            .map_err( |e| SatmapsError::SmtpError( format!("could not connect to SMTP: {e}")))?
            .credentials(creds)
            .build();

        let message = create_message( &self.from_addr, recipients, subject, body, attachment)?;

        let response = timeout( config.timeout, mailer.send(message)).await
            .map_err( |_| SatmapsError::SmtpError( "smtp send timed out".to_string()))?
            .map_err( |e| SatmapsError::SmtpError( e.to_string()))?;

        if response.is_positive() { Ok(()) } else { Err( SatmapsError::SmtpError( format!("{response:?}"))) }
    }
}

fn create_message (sender: &Mailbox, recipients: &[String], subject: &str, text: &str, attachment: &Path) -> Result<Message> {
    let bytes = fs::read(attachment)?;
    let fname = attachment.file_name().and_then( |n| n.to_str()).unwrap_or("satmap.zip").to_string();
    let part = Attachment::new(fname).body( Body::new(bytes), mime_type(attachment)?);

    let parts = MultiPart::mixed()
        .singlepart( SinglePart::plain( text.to_string()))
        .singlepart( part);

    let mut mb = Message::builder().from( sender.clone()).subject( subject);
    for recipient in recipients {
        let addr = recipient.parse::<Mailbox>()
            .map_err( |e| SatmapsError::SmtpError( format!("invalid recipient address '{recipient}': {e}")))?;
        mb = mb.bcc(addr);
    }

    mb.multipart( parts).map_err( |e| SatmapsError::SmtpError( format!("failed to construct email: {e:?}")))
}

fn mime_type (path: &Path) -> Result<ContentType> {
    let ext = path.extension().and_then( |e| e.to_str()).unwrap_or("");

    match ext {
        "zip" => Ok( "application/zip".parse().unwrap()), // we know it's valid but we can't create a ContentType explicitly
        "jpg" | "jpeg" => Ok( "image/jpeg".parse().unwrap()), // ditto
        "png" => Ok( "image/png".parse().unwrap()), // ditto

        other => Err( SatmapsError::SmtpError( format!("unsupported attachment type {other}")))
    }
}
