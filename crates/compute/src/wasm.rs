use std::path::Path;

use wasmtime::{Caller, Engine, Extern, Linker, Memory, Module, Store, TypedFunc};

use crate::{ComputeError, ComputeSource, InputState, RenderResolution};

/// Name of the module's exported linear memory.
const EXPORT_MEMORY: &str = "memory";
/// `init(width: u32, height: u32)`: one-time resolution handshake.
const EXPORT_INIT: &str = "init";
/// `frame(x: f32, y: f32, elapsed_ms: f32) -> u32`: pointer to the frame's
/// pixels inside linear memory; zero signals "no frame this tick".
const EXPORT_FRAME: &str = "frame";

/// Compute backend hosting a WebAssembly module.
///
/// The module owns the frame storage: `frame` returns an offset into its
/// exported memory and the bytes there stay valid only until the next call
/// into the module. `produce_frame` hands that region out as a borrow tied
/// to `&mut self`, so the caller has to finish copying before it can invoke
/// the module again.
///
/// The optional `env.log(ptr, len)` import gives the module a one-way text
/// diagnostic channel; messages are decoded and forwarded to `tracing`
/// without any backpressure on the module.
pub struct WasmSource {
    store: Store<()>,
    memory: Memory,
    init: TypedFunc<(u32, u32), ()>,
    frame: TypedFunc<(f32, f32, f32), u32>,
    resolution: Option<RenderResolution>,
}

impl WasmSource {
    /// Loads and instantiates the module artifact at `path`. Any failure
    /// here is fatal to session startup; there is no fallback artifact.
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let engine = Engine::default();
        let module = Module::from_file(&engine, path).map_err(|reason| {
            ComputeError::ModuleLoad {
                path: path.to_path_buf(),
                reason,
            }
        })?;
        tracing::debug!(path = %path.display(), "compute module compiled");
        Self::instantiate(&engine, &module).map_err(|err| match err {
            ComputeError::ModuleInvalid(reason) => ComputeError::ModuleLoad {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Instantiates a module supplied as in-memory bytes (embedded
    /// artifacts, tests).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ComputeError> {
        let engine = Engine::default();
        let module = Module::new(&engine, bytes).map_err(ComputeError::ModuleInvalid)?;
        Self::instantiate(&engine, &module)
    }

    fn instantiate(engine: &Engine, module: &Module) -> Result<Self, ComputeError> {
        let mut store = Store::new(engine, ());
        let mut linker: Linker<()> = Linker::new(engine);
        linker
            .func_wrap("env", "log", host_log)
            .map_err(ComputeError::ModuleInvalid)?;

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(ComputeError::ModuleInvalid)?;

        let memory = instance
            .get_memory(&mut store, EXPORT_MEMORY)
            .ok_or(ComputeError::MissingExport(EXPORT_MEMORY))?;
        let init = instance
            .get_typed_func::<(u32, u32), ()>(&mut store, EXPORT_INIT)
            .map_err(|_| ComputeError::MissingExport(EXPORT_INIT))?;
        let frame = instance
            .get_typed_func::<(f32, f32, f32), u32>(&mut store, EXPORT_FRAME)
            .map_err(|_| ComputeError::MissingExport(EXPORT_FRAME))?;

        Ok(Self {
            store,
            memory,
            init,
            frame,
            resolution: None,
        })
    }
}

impl ComputeSource for WasmSource {
    fn initialize(&mut self, resolution: RenderResolution) -> Result<(), ComputeError> {
        self.init
            .call(&mut self.store, (resolution.width(), resolution.height()))
            .map_err(ComputeError::Trap)?;
        self.resolution = Some(resolution);
        tracing::debug!(%resolution, "compute module initialised");
        Ok(())
    }

    fn produce_frame(
        &mut self,
        input: InputState,
        elapsed_ms: f64,
    ) -> Result<&[u8], ComputeError> {
        let resolution = self.resolution.ok_or(ComputeError::NotInitialized)?;
        let ptr = self
            .frame
            .call(&mut self.store, (input.x, input.y, elapsed_ms as f32))
            .map_err(ComputeError::Trap)?;
        if ptr == 0 {
            return Err(ComputeError::NullFrame);
        }

        let len = resolution.byte_len();
        let data = self.memory.data(&self.store);
        let start = ptr as usize;
        let end = start.checked_add(len).ok_or_else(|| ComputeError::OutOfBounds {
            ptr,
            len,
            memory: data.len(),
        })?;
        data.get(start..end).ok_or_else(|| ComputeError::OutOfBounds {
            ptr,
            len,
            memory: data.len(),
        })
    }
}

/// `env.log` host import: decode `len` bytes at `ptr` from the module's
/// memory and forward them to the logging sink. Fire-and-forget; malformed
/// pointers drop the message rather than faulting the module.
fn host_log(mut caller: Caller<'_, ()>, ptr: u32, len: u32) {
    let Some(Extern::Memory(memory)) = caller.get_export(EXPORT_MEMORY) else {
        return;
    };
    let data = memory.data(&caller);
    let start = ptr as usize;
    let Some(end) = start.checked_add(len as usize) else {
        return;
    };
    if let Some(bytes) = data.get(start..end) {
        let text = String::from_utf8_lossy(bytes);
        tracing::info!(target: "compute::module", "{}", text.trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Zero-filled frame at a fixed offset; logs a greeting during init.
    const SOLID_MODULE: &str = r#"
        (module
          (import "env" "log" (func $log (param i32 i32)))
          (memory (export "memory") 2)
          (data (i32.const 0) "ready")
          (func (export "init") (param i32) (param i32)
            (call $log (i32.const 0) (i32.const 5)))
          (func (export "frame") (param f32 f32 f32) (result i32)
            (i32.const 1024)))
    "#;

    const NULL_FRAME_MODULE: &str = r#"
        (module
          (memory (export "memory") 1)
          (func (export "init") (param i32) (param i32))
          (func (export "frame") (param f32 f32 f32) (result i32)
            (i32.const 0)))
    "#;

    const TRAPPING_MODULE: &str = r#"
        (module
          (memory (export "memory") 1)
          (func (export "init") (param i32) (param i32))
          (func (export "frame") (param f32 f32 f32) (result i32)
            unreachable))
    "#;

    fn resolution(width: u32, height: u32) -> RenderResolution {
        RenderResolution::new(width, height).unwrap()
    }

    #[test]
    fn produces_a_frame_of_the_exact_extent() {
        let mut source = WasmSource::from_bytes(SOLID_MODULE.as_bytes()).unwrap();
        source.initialize(resolution(16, 16)).unwrap();

        let frame = source.produce_frame(InputState::default(), 0.0).unwrap();
        assert_eq!(frame.len(), 16 * 16 * 4);
        assert!(frame.iter().all(|&byte| byte == 0));
    }

    #[test]
    fn produce_before_initialize_is_rejected() {
        let mut source = WasmSource::from_bytes(SOLID_MODULE.as_bytes()).unwrap();
        assert!(matches!(
            source.produce_frame(InputState::default(), 0.0),
            Err(ComputeError::NotInitialized)
        ));
    }

    #[test]
    fn null_frame_pointer_is_a_transient_error() {
        let mut source = WasmSource::from_bytes(NULL_FRAME_MODULE.as_bytes()).unwrap();
        source.initialize(resolution(8, 8)).unwrap();
        let err = source
            .produce_frame(InputState::default(), 0.0)
            .unwrap_err();
        assert!(matches!(err, ComputeError::NullFrame));
        assert!(err.is_transient());
    }

    #[test]
    fn trap_during_frame_is_a_transient_error() {
        let mut source = WasmSource::from_bytes(TRAPPING_MODULE.as_bytes()).unwrap();
        source.initialize(resolution(8, 8)).unwrap();
        let err = source
            .produce_frame(InputState::default(), 16.7)
            .unwrap_err();
        assert!(matches!(err, ComputeError::Trap(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn frame_past_the_end_of_memory_is_rejected() {
        // Two 64KiB pages cannot hold a 256x256 RGBA frame at offset 1024.
        let mut source = WasmSource::from_bytes(SOLID_MODULE.as_bytes()).unwrap();
        source.initialize(resolution(256, 256)).unwrap();
        assert!(matches!(
            source.produce_frame(InputState::default(), 0.0),
            Err(ComputeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn missing_exports_fail_instantiation() {
        let no_frame = r#"
            (module
              (memory (export "memory") 1)
              (func (export "init") (param i32) (param i32)))
        "#;
        assert!(matches!(
            WasmSource::from_bytes(no_frame.as_bytes()),
            Err(ComputeError::MissingExport("frame"))
        ));

        let no_memory = r#"
            (module
              (func (export "init") (param i32) (param i32))
              (func (export "frame") (param f32 f32 f32) (result i32)
                (i32.const 0)))
        "#;
        assert!(matches!(
            WasmSource::from_bytes(no_memory.as_bytes()),
            Err(ComputeError::MissingExport("memory"))
        ));
    }

    #[test]
    fn reinitialize_updates_the_expected_extent() {
        let mut source = WasmSource::from_bytes(SOLID_MODULE.as_bytes()).unwrap();
        source.initialize(resolution(16, 16)).unwrap();
        assert_eq!(
            source
                .produce_frame(InputState::default(), 0.0)
                .unwrap()
                .len(),
            16 * 16 * 4
        );

        source.initialize(resolution(32, 16)).unwrap();
        assert_eq!(
            source
                .produce_frame(InputState::default(), 0.0)
                .unwrap()
                .len(),
            32 * 16 * 4
        );
    }
}
