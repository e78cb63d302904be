use log::info;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name fragments that mark a depth-capable (ToF / stereo) camera module
const DEPTH_HINTS: [&str; 5] = ["depth", "tof", "lidar", "realsense", "stereo"];

/// Outcome of the camera probe. The rest of the application consumes only
/// the status message; the device node is kept for the tools.
#[derive(Debug, Clone)]
pub struct CameraStatus {
    pub message: String,
    pub device: Option<PathBuf>,
}

impl CameraStatus {
    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            device: None,
        }
    }
}

/// Depth-camera status service.
///
/// Probing walks the V4L2 device nodes off the main context; failures are
/// never fatal and are reported through the status string only.
pub struct CameraService {
    status: CameraStatus,
}

impl CameraService {
    /// Probe /dev/video* for a depth-capable device on a blocking background
    /// task, then hand the result back to the caller's context.
    pub async fn setup() -> Self {
        let status = match tokio::task::spawn_blocking(|| probe(Path::new("/dev"))).await {
            Ok(status) => status,
            Err(e) => CameraStatus::unavailable(format!("camera probe failed: {}", e)),
        };

        info!("Camera: {}", status.message);
        Self { status }
    }

    /// A service that never probed, with the given status message
    pub fn disabled(message: &str) -> Self {
        Self {
            status: CameraStatus::unavailable(message),
        }
    }

    pub fn status(&self) -> &str {
        &self.status.message
    }

    pub fn device(&self) -> Option<&Path> {
        self.status.device.as_deref()
    }
}

/// Scan a directory for video device nodes and pick a depth-capable one
fn probe(dev_dir: &Path) -> CameraStatus {
    let nodes = video_nodes(dev_dir);
    if nodes.is_empty() {
        return CameraStatus::unavailable("no camera hardware detected");
    }

    let mut denied = false;
    for node in &nodes {
        match File::open(node) {
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                denied = true;
                continue;
            }
            // Open errors other than permission are treated like a readable
            // node with an unhelpful name; the sysfs lookup decides below
            _ => {}
        }

        let name = sysfs_name(node).unwrap_or_else(|| node.display().to_string());
        if is_depth_name(&name) {
            return CameraStatus {
                message: format!("depth camera ready: {} ({})", name.trim(), node.display()),
                device: Some(node.clone()),
            };
        }
    }

    if denied {
        CameraStatus::unavailable("camera access denied")
    } else {
        CameraStatus::unavailable("no depth-capable camera found")
    }
}

/// video* entries under the device directory, in node order
fn video_nodes(dev_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dev_dir) else {
        return Vec::new();
    };

    let mut nodes: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("video"))
                .unwrap_or(false)
        })
        .collect();
    nodes.sort();
    nodes
}

/// The driver-reported card name for a node, from the V4L2 sysfs tree
fn sysfs_name(node: &Path) -> Option<String> {
    let name = node.file_name()?.to_str()?;
    let sysfs = PathBuf::from("/sys/class/video4linux").join(name).join("name");
    fs::read_to_string(sysfs).ok()
}

fn is_depth_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    DEPTH_HINTS.iter().any(|hint| lower.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_name_matching() {
        assert!(is_depth_name("Intel(R) RealSense(TM) Depth Camera 435"));
        assert!(is_depth_name("pmd ToF module"));
        assert!(is_depth_name("LIDAR preview"));
        assert!(!is_depth_name("Integrated RGB Camera"));
        assert!(!is_depth_name(""));
    }

    #[test]
    fn test_probe_reports_missing_hardware() {
        let dir = std::env::temp_dir().join(format!("motionview-cam-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let status = probe(&dir);
        assert_eq!(status.message, "no camera hardware detected");
        assert!(status.device.is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_probe_without_depth_device() {
        let dir = std::env::temp_dir().join(format!("motionview-cam-rgb-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        // A node with no sysfs entry falls back to its path as the name
        fs::write(dir.join("video0"), b"").unwrap();

        let status = probe(&dir);
        assert_eq!(status.message, "no depth-capable camera found");

        fs::remove_dir_all(&dir).ok();
    }
}
