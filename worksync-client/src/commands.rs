//! CLI command endpoint

use reqwest::Method;
use tracing::debug;
use worksync_core::command::to_command_line;
use worksync_core::domain::permission::{AccessLevel, VisibilityTarget};
use worksync_core::dto::command::{CliCommandRequest, CliCommandResponse};
use worksync_core::dto::worksheet::WorksheetHandle;

use crate::PlatformClient;
use crate::error::{ClientError, Result};

impl PlatformClient {
    /// Execute CLI tokens on the server in the context of a worksheet
    ///
    /// # Returns
    /// The command's textual output
    ///
    /// # Errors
    /// Returns [`ClientError::CommandFailed`] if the server reports that the
    /// command raised.
    pub async fn run_command(&self, worksheet: &WorksheetHandle, tokens: &[String]) -> Result<String> {
        let command = to_command_line(tokens);
        debug!("Running `{}` on worksheet {}", command, worksheet.uuid);

        let response = self
            .request(Method::POST, "cli/command")
            .json(&CliCommandRequest {
                worksheet_uuid: worksheet.uuid.clone(),
                command: command.clone(),
            })
            .send()
            .await?;

        let result: CliCommandResponse = self.handle_response(response).await?;
        match result.exception {
            Some(message) => Err(ClientError::CommandFailed { command, message }),
            None => Ok(result.output),
        }
    }

    /// `edit -n <new_name> <name>`
    pub async fn rename_bundle(
        &self,
        worksheet: &WorksheetHandle,
        name: &str,
        new_name: &str,
    ) -> Result<()> {
        self.run_command(worksheet, &rename_tokens(name, new_name))
            .await
            .map(|_| ())
    }

    /// `wperm`/`perm` for the public group
    pub async fn set_public_access(
        &self,
        worksheet: &WorksheetHandle,
        target: &VisibilityTarget,
        level: AccessLevel,
    ) -> Result<()> {
        self.run_command(worksheet, &permission_tokens(worksheet, target, level))
            .await
            .map(|_| ())
    }
}

fn rename_tokens(name: &str, new_name: &str) -> Vec<String> {
    vec![
        "edit".to_string(),
        "-n".to_string(),
        new_name.to_string(),
        name.to_string(),
    ]
}

fn permission_tokens(
    worksheet: &WorksheetHandle,
    target: &VisibilityTarget,
    level: AccessLevel,
) -> Vec<String> {
    let (verb, subject) = match target {
        VisibilityTarget::Worksheet => ("wperm", worksheet.uuid.as_str()),
        VisibilityTarget::Bundle(name) => ("perm", name.as_str()),
    };

    vec![
        verb.to_string(),
        subject.to_string(),
        "public".to_string(),
        level.to_string(),
    ]
}
