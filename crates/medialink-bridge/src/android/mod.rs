// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android command bridge via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`. Commands are forwarded to a host-side Java class
// that owns the actual `android.media.MediaPlayer` / `MediaRecorder` objects:
//
//     package org.medialink;
//     public final class MediaBridge {
//         // Returns a JSON result, or throws to report a failure.
//         public static String exec(String namespace, String command, String argsJson);
//         // Native side pushes status envelopes through this.
//         static native void nativePush(String json);
//     }
//
// `exec` is expected to return promptly; long-running native work reports
// back through `nativePush` as status messages on the message channel.

#![cfg(target_os = "android")]

use std::sync::{LazyLock, Mutex, OnceLock};

use jni::objects::{JClass, JObject, JString, JValue};
use jni::{JNIEnv, JavaVM};
use serde_json::Value;
use tokio::sync::mpsc;

use medialink_core::error::{MediaLinkError, Result};

use crate::traits::{CommandBridge, CommandOutcome, CommandReply};

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Binary name of the host-side bridge class.
const BRIDGE_CLASS: &str = "org.medialink.MediaBridge";

/// JNI signature of `MediaBridge.exec`.
const EXEC_SIG: &str = "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;";

static VM: OnceLock<JavaVM> = OnceLock::new();

/// Open subscriptions. `nativePush` fans every payload out to all of them.
static SUBSCRIBERS: LazyLock<Mutex<Vec<mpsc::UnboundedSender<Value>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

/// Obtain a [`JNIEnv`] for the current thread.
///
/// The `JavaVM*` comes from `ndk_context::android_context()`, set by
/// `android_main` or `ANativeActivity_onCreate`. The thread stays attached
/// for its remaining lifetime.
fn jni_env() -> Result<JNIEnv<'static>> {
    if VM.get().is_none() {
        let ctx = ndk_context::android_context();
        // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
        // The pointer is valid for the lifetime of the process.
        let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
            .map_err(|e| MediaLinkError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
        let _ = VM.set(vm);
    }
    let vm = VM
        .get()
        .ok_or_else(|| MediaLinkError::Bridge("JavaVM not initialised".into()))?;
    vm.attach_current_thread_permanently()
        .map_err(|e| MediaLinkError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// Obtain the hosting Android `Context` as a [`JObject`].
fn context() -> Result<JObject<'static>> {
    let ptr = ndk_context::android_context().context();
    if ptr.is_null() {
        return Err(MediaLinkError::Bridge(
            "Android context is null, native activity not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Context.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

fn jni_err(context: &str, e: jni::errors::Error) -> MediaLinkError {
    MediaLinkError::Bridge(format!("{context}: {e}"))
}

/// Load the bridge class through the app's class loader.
///
/// `FindClass` on a natively attached thread only sees system classes, so
/// the lookup has to go through `Context.getClassLoader()`.
fn bridge_class<'local>(env: &mut JNIEnv<'local>) -> Result<JClass<'local>> {
    let ctx = context()?;
    let loader = env
        .call_method(&ctx, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .map_err(|e| jni_err("getClassLoader", e))?
        .l()
        .map_err(|e| jni_err("getClassLoader->l", e))?;
    let name = env
        .new_string(BRIDGE_CLASS)
        .map_err(|e| jni_err("new_string(class)", e))?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&name)],
        )
        .map_err(|e| jni_err("loadClass", e))?
        .l()
        .map_err(|e| jni_err("loadClass->l", e))?;
    Ok(JClass::from(class))
}

/// Describe and clear a pending Java exception.
fn take_exception(env: &mut JNIEnv<'_>) -> Value {
    let Ok(throwable) = env.exception_occurred() else {
        return Value::from("java exception");
    };
    let _ = env.exception_clear();
    let message = env
        .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .and_then(|obj| env.get_string(&JString::from(obj)).map(String::from));
    match message {
        Ok(text) => Value::from(text),
        Err(_) => Value::from("java exception"),
    }
}

fn call_exec(namespace: &str, command: &str, args: &[Value]) -> CommandOutcome {
    let bridge_failure = |e: MediaLinkError| Value::from(e.to_string());

    let mut env = jni_env().map_err(bridge_failure)?;
    let class = bridge_class(&mut env).map_err(bridge_failure)?;

    let args_json = serde_json::to_string(args)
        .map_err(|e| bridge_failure(MediaLinkError::Serialization(e)))?;
    let j_ns = env
        .new_string(namespace)
        .map_err(|e| bridge_failure(jni_err("new_string(namespace)", e)))?;
    let j_cmd = env
        .new_string(command)
        .map_err(|e| bridge_failure(jni_err("new_string(command)", e)))?;
    let j_args = env
        .new_string(&args_json)
        .map_err(|e| bridge_failure(jni_err("new_string(args)", e)))?;

    let returned = env.call_static_method(
        &class,
        "exec",
        EXEC_SIG,
        &[
            JValue::Object(&j_ns),
            JValue::Object(&j_cmd),
            JValue::Object(&j_args),
        ],
    );

    let obj = match returned.and_then(|v| v.l()) {
        Ok(obj) => obj,
        Err(jni::errors::Error::JavaException) => return Err(take_exception(&mut env)),
        Err(e) => return Err(bridge_failure(jni_err("MediaBridge.exec", e))),
    };
    if obj.is_null() {
        return Ok(Value::Null);
    }
    let text: String = env
        .get_string(&JString::from(obj))
        .map_err(|e| bridge_failure(jni_err("get_string(result)", e)))?
        .into();
    // Plain (non-JSON) results are passed through as strings.
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the command bridge.
///
/// The struct is zero-sized; all media state lives on the Java side.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Create a new Android bridge.
    ///
    /// This does **not** touch JNI; the first JNI call happens lazily.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }

    fn is_available(&self) -> bool {
        !ndk_context::android_context().context().is_null()
    }

    fn exec(&self, namespace: &str, command: &str, args: Vec<Value>, reply: CommandReply) {
        tracing::debug!(namespace, command, "Android: MediaBridge.exec");
        let namespace = namespace.to_owned();
        let command = command.to_owned();
        // The JNI call blocks until the host answers.
        crate::offload(move || {
            let outcome = call_exec(&namespace, &command, &args);
            if let Err(ref failure) = outcome {
                tracing::warn!(command = %command, %failure, "Android: command failed");
            }
            if reply.send(outcome).is_err() {
                tracing::debug!(command = %command, "Android: reply discarded, caller gave up");
            }
        });
    }

    fn subscribe(&self, namespace: &str, action: &str) -> Result<mpsc::UnboundedReceiver<Value>> {
        let (tx, rx) = mpsc::unbounded_channel();
        SUBSCRIBERS
            .lock()
            .expect("subscriber lock poisoned")
            .push(tx);

        // Tell the native side to start pushing on this channel.
        call_exec(namespace, action, &[]).map_err(|failure| {
            MediaLinkError::Bridge(format!("{action} subscription refused: {failure}"))
        })?;

        tracing::info!(namespace, action, "Android: status subscription open");
        Ok(rx)
    }
}

/// Entry point for native status pushes (`MediaBridge.nativePush`).
#[unsafe(no_mangle)]
pub extern "system" fn Java_org_medialink_MediaBridge_nativePush<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    payload: JString<'local>,
) {
    let text: String = match env.get_string(&payload) {
        Ok(s) => s.into(),
        Err(e) => {
            tracing::warn!(error = %e, "Android: unreadable status push");
            return;
        }
    };
    let value = match serde_json::from_str::<Value>(&text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Android: status push is not JSON");
            return;
        }
    };

    let mut subscribers = SUBSCRIBERS.lock().expect("subscriber lock poisoned");
    subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    if subscribers.is_empty() {
        tracing::debug!("Android: status push with no open subscription, dropped");
    }
}
