//! Detecção de acelerador para a inferência de vetores.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Aviso emitido quando nenhum acelerador está disponível.
pub const CPU_WARNING: &str = "Usando CPU. O desempenho será lento.";

/// Dispositivo visto pelo processo no início da execução.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Cpu,
    /// GPU CUDA exposta ao processo.
    Cuda,
}

impl Device {
    /// Inspeciona o ambiente: `CUDA_VISIBLE_DEVICES` (não vazio, diferente de `-1`)
    /// ou a presença de `/dev/nvidia0`.
    pub fn detect() -> Self {
        let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
        Self::from_env(visible.as_deref(), Path::new("/dev/nvidia0").exists())
    }

    fn from_env(cuda_visible_devices: Option<&str>, device_node: bool) -> Self {
        match cuda_visible_devices.map(str::trim) {
            Some("") | Some("-1") => Device::Cpu,
            Some(_) => Device::Cuda,
            None if device_node => Device::Cuda,
            None => Device::Cpu,
        }
    }

    /// Registra no log o dispositivo em uso; sem acelerador, emite o aviso de lentidão.
    pub fn announce(self) {
        match self {
            Device::Cpu => warn!("{CPU_WARNING}"),
            Device::Cuda => info!("Acelerador CUDA detectado; vetores devolvidos à memória do host"),
        }
    }
}
