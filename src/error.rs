//! Renderer error types and the fatal error policy.
//!
//! Every device call is wrapped with the name of the operation it performed and
//! propagated with `?`. Nothing is retried: once an error reaches a lifecycle
//! hook or the frame-build worker it is handed to [`fatal`], which logs it and
//! brings the renderer down.

use ash::vk;
use thiserror::Error;

use crate::assets::AssetError;

/// Renderer error type
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Failed to {operation}: {result:?}")]
    Device {
        operation: &'static str,
        result: vk::Result,
    },
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("Shader module `{0}` is not valid")]
    InvalidShader(&'static str),
    #[error("Mesh `{0}` is not available")]
    MeshUnavailable(String),
    #[error("Pipeline creation failed: {0}")]
    PipelineUnavailable(String),
    #[error("{what} {value} does not fit in 32 bits")]
    OutOfRange { what: &'static str, value: u64 },
    #[error("Renderer resources are not initialized")]
    NotInitialized,
    #[error("Invalid renderer configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to build task pool: {0}")]
    TaskPool(String),
}

pub type RendererResult<T> = Result<T, RendererError>;

/// Attach an operation name to a raw device result.
pub(crate) trait DeviceResultExt<T> {
    fn or_device(self, operation: &'static str) -> RendererResult<T>;
}

impl<T> DeviceResultExt<T> for Result<T, vk::Result> {
    fn or_device(self, operation: &'static str) -> RendererResult<T> {
        self.map_err(|result| RendererError::Device { operation, result })
    }
}

/// Narrow a size or count to the `u32` a command takes.
pub(crate) fn command_u32(what: &'static str, value: u64) -> RendererResult<u32> {
    u32::try_from(value).map_err(|_| RendererError::OutOfRange { what, value })
}

/// Terminate on an unrecoverable renderer error.
///
/// On the surface owner's thread this unwinds into the host. On a task pool
/// worker the panic aborts the process.
#[cold]
pub(crate) fn fatal(err: RendererError) -> ! {
    log::error!("Fatal renderer error: {err}");
    panic!("fatal renderer error: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RendererError::Device {
            operation: "create vertex buffer",
            result: vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
        };
        assert_eq!(
            err.to_string(),
            "Failed to create vertex buffer: ERROR_OUT_OF_DEVICE_MEMORY"
        );

        let err = RendererError::InvalidShader("item vertex");
        assert_eq!(err.to_string(), "Shader module `item vertex` is not valid");
    }

    #[test]
    fn test_or_device_wraps_operation() {
        let raw: Result<(), vk::Result> = Err(vk::Result::ERROR_DEVICE_LOST);
        match raw.or_device("bind uniform buffer memory") {
            Err(RendererError::Device { operation, result }) => {
                assert_eq!(operation, "bind uniform buffer memory");
                assert_eq!(result, vk::Result::ERROR_DEVICE_LOST);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_command_u32_rejects_wide_values() {
        assert_eq!(command_u32("instance count", 16384).unwrap(), 16384);
        assert_eq!(command_u32("instance count", u32::MAX as u64).unwrap(), u32::MAX);

        let err = command_u32("dynamic uniform offset", 1 << 32).unwrap_err();
        assert!(matches!(
            err,
            RendererError::OutOfRange {
                what: "dynamic uniform offset",
                value: 0x1_0000_0000,
            }
        ));
        assert_eq!(
            err.to_string(),
            "dynamic uniform offset 4294967296 does not fit in 32 bits"
        );
    }

    #[test]
    #[should_panic(expected = "fatal renderer error")]
    fn test_fatal_panics() {
        fatal(RendererError::InvalidConfig("boom".into()));
    }
}
