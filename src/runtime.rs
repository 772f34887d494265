//! Dynamic-invocation fallback.
//!
//! Used only when a class cannot be analyzed from source. Exactly three
//! methods may be invoked, and nothing a target class throws escapes as
//! anything but a [`RuntimeError`].

use log::debug;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// The only methods the runtime fallback may call on a target instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhitelistedMethod {
    Rules,
    Attributes,
    Messages,
}

impl WhitelistedMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhitelistedMethod::Rules => "rules",
            WhitelistedMethod::Attributes => "attributes",
            WhitelistedMethod::Messages => "messages",
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no runtime available")]
    Unavailable,

    #[error("{class}::{method}() threw: {message}")]
    Thrown {
        class: String,
        method: &'static str,
        message: String,
    },

    #[error("failed to run PHP: {0}")]
    Process(String),

    #[error("invalid runtime output: {0}")]
    InvalidOutput(String),

    #[error("runtime timed out after {0}s")]
    Timeout(u64),
}

pub trait RuntimeProvider {
    fn is_available(&self) -> bool;

    /// Instantiate `class` without running its constructor and call one
    /// whitelisted method, returning its JSON-encoded result.
    ///
    /// Rule objects are encoded as `{"__class": FQN, ...properties}`.
    fn invoke(&self, class: &str, method: WhitelistedMethod) -> Result<Value, RuntimeError>;
}

/// The default provider: no runtime, every call is `Unavailable`
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRuntime;

impl RuntimeProvider for NoRuntime {
    fn is_available(&self) -> bool {
        false
    }

    fn invoke(&self, _class: &str, _method: WhitelistedMethod) -> Result<Value, RuntimeError> {
        Err(RuntimeError::Unavailable)
    }
}

const INVOKE_SCRIPT: &str = r#"
$root = getcwd();
if (is_file($root . '/vendor/autoload.php')) { require $root . '/vendor/autoload.php'; }
if (is_file($root . '/bootstrap/app.php')) {
    try {
        $app = require $root . '/bootstrap/app.php';
        $app->make(\Illuminate\Contracts\Console\Kernel::class)->bootstrap();
    } catch (\Throwable $e) {}
}
function __analyzer_export($value, $depth = 0) {
    if ($depth > 8) { return null; }
    if ($value instanceof \Closure) { return ['__class' => 'Closure']; }
    if (is_object($value)) {
        $out = ['__class' => get_class($value)];
        if (method_exists($value, '__toString')) {
            try { $out['__string'] = (string) $value; } catch (\Throwable $e) {}
        }
        $reflection = new \ReflectionObject($value);
        foreach ($reflection->getProperties() as $property) {
            if ($property->isStatic() || $property->isPrivate()) { continue; }
            $property->setAccessible(true);
            if (!$property->isInitialized($value)) { continue; }
            $out[$property->getName()] = __analyzer_export($property->getValue($value), $depth + 1);
        }
        return $out;
    }
    if (is_array($value)) {
        $out = [];
        foreach ($value as $k => $v) { $out[$k] = __analyzer_export($v, $depth + 1); }
        return $out;
    }
    return $value;
}
try {
    $reflection = new \ReflectionClass($argv[1]);
    $instance = $reflection->newInstanceWithoutConstructor();
    $method = $argv[2];
    $value = method_exists($instance, $method) ? $instance->$method() : [];
    echo json_encode(['ok' => true, 'value' => __analyzer_export($value)]);
} catch (\Throwable $e) {
    echo json_encode(['ok' => false, 'error' => get_class($e) . ': ' . $e->getMessage()]);
}
"#;

/// Runs a PHP binary against the project's autoloader
#[derive(Debug, Clone)]
pub struct PhpProcessRuntime {
    binary: String,
    project_root: PathBuf,
    timeout: Duration,
}

impl PhpProcessRuntime {
    pub fn new(binary: impl Into<String>, project_root: PathBuf, timeout_secs: u64) -> Self {
        Self {
            binary: binary.into(),
            project_root,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    fn run(&self, class: &str, method: WhitelistedMethod) -> Result<String, RuntimeError> {
        let mut child = Command::new(&self.binary)
            .arg("-r")
            .arg(INVOKE_SCRIPT)
            .arg("--")
            .arg(class)
            .arg(method.as_str())
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RuntimeError::Process(e.to_string()))?;

        // drained concurrently: the child blocks once the pipe buffer is full
        let reader = child.stdout.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut stdout = String::new();
                pipe.read_to_string(&mut stdout).map(|_| stdout)
            })
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    if let Some(reader) = reader {
                        let _ = reader.join();
                    }
                    return Err(RuntimeError::Timeout(self.timeout.as_secs()));
                }
                Ok(None) => thread::sleep(Duration::from_millis(20)),
                Err(e) => return Err(RuntimeError::Process(e.to_string())),
            }
        };

        let stdout = match reader {
            Some(reader) => reader
                .join()
                .map_err(|_| RuntimeError::Process("stdout reader panicked".to_string()))?
                .map_err(|e| RuntimeError::Process(e.to_string()))?,
            None => String::new(),
        };
        if !status.success() {
            return Err(RuntimeError::Process(format!("php exited with {}", status)));
        }
        Ok(stdout)
    }
}

/// Decode the `{ok, value|error}` envelope printed by the invoke script
pub(crate) fn decode_envelope(
    class: &str,
    method: WhitelistedMethod,
    output: &str,
) -> Result<Value, RuntimeError> {
    let line = output
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| RuntimeError::InvalidOutput("empty output".to_string()))?;
    let envelope: Value =
        serde_json::from_str(line.trim()).map_err(|e| RuntimeError::InvalidOutput(e.to_string()))?;
    match envelope.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(envelope.get("value").cloned().unwrap_or(Value::Null)),
        Some(false) => Err(RuntimeError::Thrown {
            class: class.to_string(),
            method: method.as_str(),
            message: envelope
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }),
        None => Err(RuntimeError::InvalidOutput(
            "missing `ok` field in runtime output".to_string(),
        )),
    }
}

impl RuntimeProvider for PhpProcessRuntime {
    fn is_available(&self) -> bool {
        true
    }

    fn invoke(&self, class: &str, method: WhitelistedMethod) -> Result<Value, RuntimeError> {
        debug!("Invoking {}::{}() through {}", class, method.as_str(), self.binary);
        let output = self.run(class, method)?;
        decode_envelope(class, method, &output)
    }
}
