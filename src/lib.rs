// ─── wifi-tcp-sentinel: lógica independiente del hardware ───
//
// Todo lo que no toca el SDK de ESP-IDF vive aquí, para poder testearlo
// en el host con `cargo test`:
//
// - config:    constantes de compilación y credenciales
// - handshake: máquina de estados de la conexión WiFi (retries, outcome)
// - sentinel:  loop de lectura hasta la línea "HELLO\n"
// - tcp:       conexión saliente al servidor + sentinel
//
// El binario (src/main.rs + src/wifi.rs) conecta esto con el driver real.

pub mod config;
pub mod handshake;
pub mod sentinel;
pub mod tcp;

/// Tag de todos los logs del firmware (EspLogger lo usa como tag de ESP_LOG).
pub const LOG_TAG: &str = "WIFI";
