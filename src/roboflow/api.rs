use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::RobofetchError;

const API_BASE: &str = "https://api.roboflow.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Export generation is asynchronous on the Roboflow side; the endpoint
/// reports a progress fraction until the archive link is ready.
const MAX_EXPORT_POLLS: u32 = 30;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Blocking client for the Roboflow export API.
pub struct RoboflowClient {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl RoboflowClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, API_BASE.to_string())
    }

    /// Mainly for tests pointing at a stub server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        let agent: ureq::Agent = config.into();
        Self {
            agent,
            api_key,
            base_url,
        }
    }

    /// Resolve the archive link for a versioned export, polling while the
    /// export is still being generated server-side.
    pub fn resolve_export(
        &self,
        workspace: &str,
        project: &str,
        version: &str,
        format: &str,
    ) -> Result<String, RobofetchError> {
        let url = self
            .export_url(workspace, project, version, format)
            .map_err(|message| RobofetchError::ExportResolve {
                project: project.to_string(),
                message,
            })?;

        for attempt in 0..MAX_EXPORT_POLLS {
            if attempt > 0 {
                thread::sleep(POLL_INTERVAL);
            }

            let json =
                self.fetch_json(url.as_str())
                    .map_err(|message| RobofetchError::ExportResolve {
                        project: project.to_string(),
                        message,
                    })?;

            if let Some(link) = export_link(&json) {
                info!(project, version, "export link resolved");
                return Ok(link);
            }

            match export_progress(&json) {
                Some(progress) => debug!(project, progress, attempt, "export still generating"),
                None => {
                    return Err(RobofetchError::ExportResolve {
                        project: project.to_string(),
                        message: "no export link in API response".to_string(),
                    })
                }
            }
        }

        Err(RobofetchError::ExportResolve {
            project: project.to_string(),
            message: format!("export did not become ready after {MAX_EXPORT_POLLS} polls"),
        })
    }

    /// Stream the export archive to `dest`.
    pub fn download_archive(&self, link: &str, dest: &Path) -> Result<u64, RobofetchError> {
        let mut response =
            self.agent
                .get(link)
                .call()
                .map_err(|source| RobofetchError::ExportDownload {
                    url: link.to_string(),
                    message: source.to_string(),
                })?;

        let mut reader = response.body_mut().as_reader();
        let mut file = fs::File::create(dest)?;
        let bytes =
            io::copy(&mut reader, &mut file).map_err(|source| RobofetchError::ExportDownload {
                url: link.to_string(),
                message: source.to_string(),
            })?;

        info!(bytes, dest = %dest.display(), "export archive downloaded");
        Ok(bytes)
    }

    fn export_url(
        &self,
        workspace: &str,
        project: &str,
        version: &str,
        format: &str,
    ) -> Result<url::Url, String> {
        let mut url = url::Url::parse(&self.base_url).map_err(|source| source.to_string())?;

        url.path_segments_mut()
            .map_err(|_| format!("base URL '{}' cannot be a base", self.base_url))?
            .push(workspace)
            .push(project)
            .push(version)
            .push(format);

        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }

    fn fetch_json(&self, url: &str) -> Result<Value, String> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|source| source.to_string())?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|source| source.to_string())
    }
}

/// Extract the ready-to-download archive link from an export response.
fn export_link(json: &Value) -> Option<String> {
    json.get("export")
        .and_then(|export| export.get("link"))
        .and_then(Value::as_str)
        .or_else(|| json.get("link").and_then(Value::as_str))
        .map(str::to_string)
}

/// Progress fraction reported while the export is still being generated.
fn export_progress(json: &Value) -> Option<f64> {
    json.get("progress")
        .and_then(Value::as_f64)
        .or_else(|| {
            json.get("export")
                .and_then(|export| export.get("progress"))
                .and_then(Value::as_f64)
        })
}
