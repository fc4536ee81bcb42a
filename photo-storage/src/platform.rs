// Android bridge
//
// The camera, the permission subsystem, the files directory and the SDK level
// are reached over JNI. The activity is expected to expose the static
// `getInstance()` helper and the camera methods used by `capture`. On other
// platforms every permission reports granted and there is no camera.

use crate::error::StorageError;
use crate::permissions::Permission;
use std::collections::HashMap;
use std::path::PathBuf;

const DEFAULT_MAIN_ACTIVITY_CLASS: &str = "dev/dioxus/main/MainActivity";

#[cfg(target_os = "android")]
const PERMISSION_REQUEST_CODE: i32 = 0x5701;

/// Poll steps of 100 ms while the permission dialog is open
#[cfg(target_os = "android")]
const PERMISSION_POLL_STEPS: u32 = 300;

/// Steps to wait for the dialog to take focus before assuming none was shown
const DIALOG_APPEAR_STEPS: u32 = 20;

#[cfg(target_os = "android")]
use jni::objects::{JClass, JObject, JValue};

/// Tracks the permission dialog through the activity's window focus
///
/// The dialog takes focus from the activity while it is shown, so focus
/// coming back means the user answered. If focus is never lost the system
/// answered without a dialog (e.g. "don't ask again").
#[derive(Debug, Default)]
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
struct DialogWatch {
    focus_lost: bool,
}

#[cfg_attr(not(target_os = "android"), allow(dead_code))]
impl DialogWatch {
    /// Feeds one poll step; `true` once the dialog is gone
    fn closed(&mut self, step: u32, has_focus: bool) -> bool {
        if !has_focus {
            self.focus_lost = true;
            return false;
        }
        self.focus_lost || step >= DIALOG_APPEAR_STEPS
    }
}

/// Which activity class hosts the JNI helpers
#[derive(Debug, Clone)]
pub struct AndroidActivityConfig {
    /// Fully qualified class name in slash format (e.g., "com/example/myapp/MainActivity")
    pub main_activity_class: String,
}

impl Default for AndroidActivityConfig {
    fn default() -> Self {
        Self {
            main_activity_class: DEFAULT_MAIN_ACTIVITY_CLASS.to_string(),
        }
    }
}

#[cfg(target_os = "android")]
pub(crate) fn jni_error<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> StorageError {
    move |e| StorageError::Platform(format!("{} failed: {}", what, e))
}

#[cfg(target_os = "android")]
pub(crate) fn java_vm() -> Result<jni::JavaVM, StorageError> {
    let vm_ptr = ndk_context::android_context().vm() as *mut jni::sys::JavaVM;
    unsafe { jni::JavaVM::from_raw(vm_ptr) }.map_err(jni_error("JavaVM"))
}

#[cfg(target_os = "android")]
fn android_context_object<'a>() -> JObject<'a> {
    unsafe { JObject::from_raw(ndk_context::android_context().context() as jni::sys::jobject) }
}

/// Activity instance and class, looked up through the app class loader
#[cfg(target_os = "android")]
pub(crate) fn get_activity_instance<'a>(
    env: &mut jni::JNIEnv<'a>,
    config: &AndroidActivityConfig,
) -> Result<(JObject<'a>, JClass<'a>), StorageError> {
    let context = android_context_object();
    let loader = env
        .call_method(&context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .map_err(jni_error("getClassLoader"))?
        .l()
        .map_err(jni_error("getClassLoader result"))?;

    let class_name = env
        .new_string(config.main_activity_class.replace('/', "."))
        .map_err(jni_error("new_string"))?;
    let cls = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&class_name)],
        )
        .map_err(jni_error("ClassLoader.loadClass"))?
        .l()
        .map_err(jni_error("loadClass result"))?;
    let cls = JClass::from(cls);

    let signature = format!("()L{};", config.main_activity_class);
    let instance = match env.call_static_method(&cls, "getInstance", &signature, &[]) {
        Ok(value) => value.l().map_err(jni_error("getInstance result"))?,
        Err(_) => {
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_clear();
            }
            env.get_static_field(&cls, "instance", &signature)
                .map_err(jni_error("instance field"))?
                .l()
                .map_err(jni_error("instance field value"))?
        }
    };

    if instance.is_null() {
        return Err(StorageError::Platform(
            "MainActivity instance is null - Activity not initialized?".to_string(),
        ));
    }

    Ok((instance, cls))
}

/// `Context.getFilesDir()`
#[cfg(target_os = "android")]
pub fn files_dir() -> Result<PathBuf, StorageError> {
    let vm = java_vm()?;
    let mut env = vm.attach_current_thread().map_err(jni_error("JNI attach"))?;
    let context = android_context_object();

    let file = env
        .call_method(&context, "getFilesDir", "()Ljava/io/File;", &[])
        .map_err(jni_error("getFilesDir"))?
        .l()
        .map_err(jni_error("getFilesDir result"))?;
    let path_obj = env
        .call_method(&file, "getAbsolutePath", "()Ljava/lang/String;", &[])
        .map_err(jni_error("getAbsolutePath"))?
        .l()
        .map_err(jni_error("getAbsolutePath result"))?;
    let path: String = env
        .get_string(&path_obj.into())
        .map_err(jni_error("get_string"))?
        .into();

    Ok(PathBuf::from(path))
}

#[cfg(not(target_os = "android"))]
pub fn files_dir() -> Result<PathBuf, StorageError> {
    Ok(PathBuf::from("./data"))
}

/// `Build.VERSION.SDK_INT`
#[cfg(target_os = "android")]
pub fn sdk_int() -> Result<u32, StorageError> {
    let vm = java_vm()?;
    let mut env = vm.attach_current_thread().map_err(jni_error("JNI attach"))?;
    let version = env
        .find_class("android/os/Build$VERSION")
        .map_err(jni_error("Build.VERSION lookup"))?;
    let sdk = env
        .get_static_field(&version, "SDK_INT", "I")
        .map_err(jni_error("SDK_INT"))?
        .i()
        .map_err(jni_error("SDK_INT value"))?;
    Ok(sdk.max(0) as u32)
}

#[cfg(target_os = "android")]
fn check_with_env(
    env: &mut jni::JNIEnv,
    context: &JObject,
    permission: Permission,
) -> Result<bool, StorageError> {
    let name = env
        .new_string(permission.as_str())
        .map_err(jni_error("new_string"))?;
    let result = env
        .call_method(
            context,
            "checkSelfPermission",
            "(Ljava/lang/String;)I",
            &[JValue::Object(&name)],
        )
        .map_err(jni_error("checkSelfPermission"))?
        .i()
        .map_err(jni_error("checkSelfPermission result"))?;
    // PackageManager.PERMISSION_GRANTED
    Ok(result == 0)
}

/// Current grant state of `permission`
#[cfg(target_os = "android")]
pub fn check_permission(permission: Permission) -> Result<bool, StorageError> {
    let vm = java_vm()?;
    let mut env = vm.attach_current_thread().map_err(jni_error("JNI attach"))?;
    let context = android_context_object();
    check_with_env(&mut env, &context, permission)
}

#[cfg(not(target_os = "android"))]
pub fn check_permission(_permission: Permission) -> Result<bool, StorageError> {
    Ok(true)
}

/// Shows the system permission dialog and reports the outcome per permission
///
/// Blocks until every permission is granted or the dialog poll times out;
/// whatever is granted by then is reported.
#[cfg(target_os = "android")]
pub fn request_permissions(
    permissions: &[Permission],
    config: &AndroidActivityConfig,
) -> Result<HashMap<Permission, bool>, StorageError> {
    let vm = java_vm()?;
    let mut env = vm.attach_current_thread().map_err(jni_error("JNI attach"))?;
    let context = android_context_object();
    let (activity, _cls) = get_activity_instance(&mut env, config)?;

    let array = env
        .new_object_array(permissions.len() as i32, "java/lang/String", JObject::null())
        .map_err(jni_error("new_object_array"))?;
    for (i, permission) in permissions.iter().enumerate() {
        let name = env
            .new_string(permission.as_str())
            .map_err(jni_error("new_string"))?;
        env.set_object_array_element(&array, i as i32, name)
            .map_err(jni_error("set_object_array_element"))?;
    }

    env.call_method(
        &activity,
        "requestPermissions",
        "([Ljava/lang/String;I)V",
        &[JValue::Object(&array), JValue::Int(PERMISSION_REQUEST_CODE)],
    )
    .map_err(jni_error("requestPermissions"))?;

    let mut watch = DialogWatch::default();
    for step in 0..PERMISSION_POLL_STEPS {
        std::thread::sleep(std::time::Duration::from_millis(100));
        let mut all_granted = true;
        for permission in permissions {
            all_granted &= check_with_env(&mut env, &context, *permission)?;
        }
        if all_granted {
            break;
        }

        let has_focus = env
            .call_method(&activity, "hasWindowFocus", "()Z", &[])
            .and_then(|v| v.z())
            .map_err(jni_error("hasWindowFocus"))?;
        if watch.closed(step, has_focus) {
            log::debug!("Permission dialog closed after {} steps", step + 1);
            break;
        }
    }

    let mut results = HashMap::new();
    for permission in permissions {
        results.insert(*permission, check_with_env(&mut env, &context, *permission)?);
    }
    log::info!("Permission results: {:?}", results);
    Ok(results)
}

#[cfg(not(target_os = "android"))]
pub fn request_permissions(
    permissions: &[Permission],
    _config: &AndroidActivityConfig,
) -> Result<HashMap<Permission, bool>, StorageError> {
    Ok(permissions.iter().map(|p| (*p, true)).collect())
}

#[cfg(all(test, not(target_os = "android")))]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_answered_when_focus_returns() {
        let mut watch = DialogWatch::default();
        assert!(!watch.closed(0, true));
        assert!(!watch.closed(1, false));
        assert!(!watch.closed(2, false));
        assert!(watch.closed(3, true));
    }

    #[test]
    fn test_no_dialog_gives_up_after_grace_steps() {
        let mut watch = DialogWatch::default();
        for step in 0..DIALOG_APPEAR_STEPS {
            assert!(!watch.closed(step, true));
        }
        assert!(watch.closed(DIALOG_APPEAR_STEPS, true));
    }

    #[test]
    fn test_open_dialog_keeps_waiting() {
        let mut watch = DialogWatch::default();
        assert!(!watch.closed(0, false));
        assert!(!watch.closed(DIALOG_APPEAR_STEPS * 5, false));
    }

    #[test]
    fn test_desktop_grants_everything() {
        assert!(check_permission(Permission::ReadExternalStorage).unwrap());
        let results = request_permissions(
            &[Permission::WriteExternalStorage],
            &AndroidActivityConfig::default(),
        )
        .unwrap();
        assert_eq!(results.get(&Permission::WriteExternalStorage), Some(&true));
        assert_eq!(results.len(), 1);
    }
}
