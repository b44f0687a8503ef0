use serde_derive::{Deserialize, Serialize};

/// Settings for turning buffer entries into thread and process JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingProps {
    /// Samples and markers before this time (in ms) are left out.
    pub since_time: Option<f64>,
    /// The thread's name. Defaults to `Thread <tid>`.
    pub thread_name: Option<String>,
    pub process_type: String,
    /// The label of the frame that every sampled stack starts with.
    pub root_frame_label: String,
}

impl Default for StreamingProps {
    fn default() -> Self {
        Self {
            since_time: None,
            thread_name: None,
            process_type: "default".to_string(),
            root_frame_label: "(root)".to_string(),
        }
    }
}

impl StreamingProps {
    pub fn includes_time(&self, time: f64) -> bool {
        match self.since_time {
            Some(since_time) => time >= since_time,
            None => true,
        }
    }
}
