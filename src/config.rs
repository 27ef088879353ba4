// ─── Configuración de compilación ───
//
// No hay sistema de configuración en runtime: credenciales y servidor se
// fijan al compilar, por ejemplo:
//
//   WIFI_SSID=MiRed WIFI_PASSWORD=secreto SERVER_ADDR=192.168.1.20 cargo build
//
// Variables ausentes usan el default de abajo.

use anyhow::{bail, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::sentinel::MatchMode;

/// Longitud máxima de SSID que acepta el driver (802.11).
pub const SSID_MAX_LEN: usize = 32;
/// Longitud máxima de passphrase WPA2.
pub const PASSWORD_MAX_LEN: usize = 64;

pub const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};

pub const WIFI_PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
    Some(password) => password,
    None => "",
};

/// IPv4 literal del servidor TCP.
pub const SERVER_ADDR: &str = match option_env!("SERVER_ADDR") {
    Some(addr) => addr,
    None => "172.28.242.211",
};

pub const SERVER_PORT: u16 = 12345;

/// Protected Management Frames: se anuncian como soportados pero no se
/// exigen, así el station también se asocia a APs sin PMF.
pub const PMF_CAPABLE: bool = true;
pub const PMF_REQUIRED: bool = false;

/// Cómo se reconoce la línea sentinel. `Line` tolera que "HELLO\n" llegue
/// partido en varios reads; `WholeRead` reproduce el firmware en C.
pub const SENTINEL_MATCH: MatchMode = MatchMode::Line;

// ─── Credenciales con borrado seguro ───

/// Credenciales WiFi de station.
///
/// `ZeroizeOnDrop` sobreescribe los Strings con ceros al salir de scope,
/// así la passphrase no queda en RAM después de configurar el driver.
#[derive(Debug, Default, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
}

impl Credentials {
    pub fn new(ssid: &str, password: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }

    /// Credenciales horneadas en el binario (`WIFI_SSID` / `WIFI_PASSWORD`).
    pub fn from_build_env() -> Self {
        Self::new(WIFI_SSID, WIFI_PASSWORD)
    }

    /// Con passphrase se exige WPA2-Personal; sin ella, red abierta.
    pub fn requires_auth(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.ssid.is_empty() {
            bail!("WiFi SSID not configured (set WIFI_SSID at build time)");
        }
        if self.ssid.len() > SSID_MAX_LEN {
            bail!(
                "WiFi SSID too long: {} bytes (max {})",
                self.ssid.len(),
                SSID_MAX_LEN
            );
        }
        if self.password.len() > PASSWORD_MAX_LEN {
            bail!(
                "WiFi password too long: {} bytes (max {})",
                self.password.len(),
                PASSWORD_MAX_LEN
            );
        }
        Ok(())
    }

    /// Copia SSID y passphrase a los strings de capacidad fija del driver.
    pub fn to_fixed(
        &self,
    ) -> Result<(
        heapless::String<SSID_MAX_LEN>,
        heapless::String<PASSWORD_MAX_LEN>,
    )> {
        self.validate()?;

        let mut ssid = heapless::String::new();
        let mut password = heapless::String::new();
        if ssid.push_str(&self.ssid).is_err() || password.push_str(&self.password).is_err() {
            bail!("WiFi credentials do not fit the driver configuration");
        }
        Ok((ssid, password))
    }
}
