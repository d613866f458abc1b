use thiserror::Error;

/// Which polled resource a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Summary,
    Dates,
    TimeSeries,
    Scenario,
    News,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Summary,
        Resource::Dates,
        Resource::TimeSeries,
        Resource::Scenario,
        Resource::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Summary => "summary",
            Resource::Dates => "dates",
            Resource::TimeSeries => "timeseries",
            Resource::Scenario => "scenario_distribution",
            Resource::News => "news",
        }
    }

    /// Inline message shown next to the section in strict mode.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Resource::Summary => "サマリーデータの取得に失敗しました",
            Resource::Dates => "基準日リストの取得に失敗しました",
            Resource::TimeSeries => "時系列データの取得に失敗しました",
            Resource::Scenario => "シナリオPL分布の取得に失敗しました",
            Resource::News => "ニュースの取得に失敗しました",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way a fetch can fail. All variants take the same recovery path.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{resource} request failed: {source}")]
    Transport {
        resource: Resource,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed {resource} request: {status}")]
    Status { resource: Resource, status: u16 },

    #[error("{resource} response could not be decoded: {source}")]
    Decode {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn resource(&self) -> Resource {
        match self {
            FetchError::Transport { resource, .. }
            | FetchError::Status { resource, .. }
            | FetchError::Decode { resource, .. } => *resource,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Failed to persist theme: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode theme: {0}")]
    Encode(#[from] serde_json::Error),
}
