// Camera capture
//
// On Android the activity's `launchCamera()` is called over JNI and the
// resulting file is polled for, then decoded into memory and removed. Other
// platforms have no camera.

use crate::platform::AndroidActivityConfig;
use image::DynamicImage;

#[derive(Debug, Clone)]
pub enum CaptureError {
    PermissionDenied(String),
    Timeout(String),
    Decode(String),
    PlatformNotSupported(String),
    Other(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            CaptureError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            CaptureError::Decode(msg) => write!(f, "Decode error: {}", msg),
            CaptureError::PlatformNotSupported(msg) => write!(f, "Platform not supported: {}", msg),
            CaptureError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Produces at most one in-memory image per call
///
/// `Ok(None)` means the user cancelled.
pub trait CaptureSource: Send + Sync {
    fn capture(&self) -> Result<Option<DynamicImage>, CaptureError>;
}

/// The device camera
#[derive(Debug, Clone, Default)]
pub struct CameraCapture {
    pub config: AndroidActivityConfig,
}

#[cfg(target_os = "android")]
impl CaptureSource for CameraCapture {
    fn capture(&self) -> Result<Option<DynamicImage>, CaptureError> {
        let path = match android::launch_camera(&self.config)? {
            Some(path) => path,
            None => return Ok(None),
        };

        let bytes = std::fs::read(&path)
            .map_err(|e| CaptureError::Other(format!("Reading {:?} failed: {}", path, e)))?;
        if let Err(e) = std::fs::remove_file(&path) {
            log::warn!("Could not remove camera file {:?}: {}", path, e);
        }

        crate::encode::decode(&bytes)
            .map(Some)
            .map_err(|e| CaptureError::Decode(e.to_string()))
    }
}

#[cfg(not(target_os = "android"))]
impl CaptureSource for CameraCapture {
    fn capture(&self) -> Result<Option<DynamicImage>, CaptureError> {
        let _ = &self.config;
        Err(CaptureError::PlatformNotSupported(
            "Camera not available on this platform".to_string(),
        ))
    }
}

#[cfg(target_os = "android")]
mod android {
    use super::CaptureError;
    use crate::platform::{get_activity_instance, java_vm, AndroidActivityConfig};
    use std::path::PathBuf;

    /// Poll steps of 100 ms while the camera is open
    const CAMERA_POLL_STEPS: u32 = 600;

    fn err<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> CaptureError {
        move |e| CaptureError::Other(format!("{} failed: {}", what, e))
    }

    fn static_string(
        env: &mut jni::JNIEnv,
        cls: &jni::objects::JClass,
        method: &str,
    ) -> Result<Option<String>, CaptureError> {
        let obj = match env
            .call_static_method(cls, method, "()Ljava/lang/String;", &[])
            .and_then(|v| v.l())
        {
            Ok(obj) if !obj.is_null() => obj,
            _ => return Ok(None),
        };
        let value: String = env
            .get_string((&obj).into())
            .map_err(err("String conversion"))?
            .into();
        Ok(Some(value))
    }

    /// Path of the captured photo, or `None` when the user backed out
    pub(super) fn launch_camera(
        config: &AndroidActivityConfig,
    ) -> Result<Option<PathBuf>, CaptureError> {
        let vm = java_vm().map_err(|e| CaptureError::Other(e.to_string()))?;
        let mut env = vm.attach_current_thread().map_err(err("JNI attach"))?;
        let (activity, main_cls) = get_activity_instance(&mut env, config)
            .map_err(|e| CaptureError::Other(e.to_string()))?;

        env.call_static_method(&main_cls, "clearLastError", "()V", &[])
            .map_err(err("clearLastError"))?;
        env.call_method(&activity, "launchCamera", "()V", &[])
            .map_err(err("launchCamera"))?;

        for _ in 0..CAMERA_POLL_STEPS {
            std::thread::sleep(std::time::Duration::from_millis(100));

            if let Some(path) = static_string(&mut env, &main_cls, "getLastPhotoPath")? {
                return Ok(Some(PathBuf::from(path)));
            }

            if let Some(error) = static_string(&mut env, &main_cls, "getLastError")? {
                if error.to_ascii_lowercase().contains("cancel") {
                    log::info!("Camera cancelled: {}", error);
                    return Ok(None);
                }
                return Err(CaptureError::PermissionDenied(error));
            }
        }

        Err(CaptureError::Timeout("Camera timeout - no photo taken".to_string()))
    }
}
