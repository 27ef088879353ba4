// ─── Módulo WiFi — Conexión station sobre el driver de ESP-IDF ───
//
// Conecta el driver real con la máquina de estados de `handshake`:
// los callbacks del system event loop solo traducen eventos a `LinkEvent`
// y los mandan por un canal; el hilo principal decide qué hacer.
//
// Cualquier error del driver (init, subscribe, config, start) es fatal y
// sube con `?` hasta main(). Los disconnects NO son errores: los maneja
// el handshake con su contador de reintentos.

use anyhow::{Context, Result};
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, PmfConfiguration};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::peripheral,
    netif::IpEvent,
    nvs::EspDefaultNvsPartition,
    wifi::{EspWifi, WifiEvent},
};
use log::info;
use std::sync::mpsc;

use wifi_tcp_sentinel::{
    config::{self, Credentials},
    handshake::{self, ConnectionOutcome, LinkEvent, StationControl},
    LOG_TAG,
};

/// El driver visto desde el handshake.
struct Radio<'a>(&'a mut EspWifi<'static>);

impl StationControl for Radio<'_> {
    fn start_radio(&mut self) -> Result<()> {
        self.0.start()?;
        Ok(())
    }

    fn request_connect(&mut self) -> Result<()> {
        self.0.connect()?;
        Ok(())
    }
}

/// Configuración station: auth WPA2 solo si hay passphrase, PMF soportado
/// pero opcional. Sin umbral de RSSI (el default del driver acepta
/// cualquier señal, igual que -127).
fn client_configuration(credentials: &Credentials) -> Result<Configuration> {
    let (ssid, password) = credentials.to_fixed()?;

    let auth_method = if credentials.requires_auth() {
        AuthMethod::WPA2Personal
    } else {
        info!(target: LOG_TAG, "WiFi password empty, using open network");
        AuthMethod::None
    };

    let pmf_cfg = if config::PMF_CAPABLE {
        PmfConfiguration::Capable {
            required: config::PMF_REQUIRED,
        }
    } else {
        PmfConfiguration::NotCapable
    };

    Ok(Configuration::Client(ClientConfiguration {
        ssid,
        password,
        auth_method,
        pmf_cfg,
        ..Default::default()
    }))
}

/// Levanta el WiFi en modo station y espera IP o fallo.
///
/// Retorna el driver en un Box junto con el resultado. Mientras el Box
/// exista, la conexión se mantiene (RAII); con `Failure` se puede dropear.
pub fn connect(
    credentials: &Credentials,
    modem: impl peripheral::Peripheral<P = esp_idf_svc::hal::modem::Modem> + 'static,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
) -> Result<(Box<EspWifi<'static>>, ConnectionOutcome)> {
    let configuration = client_configuration(credentials)?;

    info!(target: LOG_TAG, "Connecting to WiFi: {}", credentials.ssid);

    // EspWifi::new() inicializa netif, crea la interfaz STA default y el
    // driver. La partición NVS queda como caché de credenciales del vendor.
    let mut wifi = Box::new(
        EspWifi::new(modem, sysloop.clone(), Some(nvs)).context("WiFi driver init failed")?,
    );

    // ─── Suscripciones: callbacks → canal ───

    // Un canal por intento; se destruye junto con las suscripciones.
    let (tx, rx) = mpsc::channel();

    let wifi_tx = tx.clone();
    let wifi_subscription = sysloop
        .subscribe::<WifiEvent, _>(move |event| {
            let link_event = match event {
                WifiEvent::StaStarted => LinkEvent::StaStarted,
                WifiEvent::StaConnected(_) => LinkEvent::StaConnected,
                WifiEvent::StaDisconnected(_) => LinkEvent::StaDisconnected,
                _ => return,
            };
            // El receptor solo desaparece cuando el handshake ya resolvió.
            let _ = wifi_tx.send(link_event);
        })
        .context("failed to subscribe to WiFi events")?;

    let ip_tx = tx;
    let ip_subscription = sysloop
        .subscribe::<IpEvent, _>(move |event| {
            if let IpEvent::DhcpIpAssigned(_) = event {
                let _ = ip_tx.send(LinkEvent::GotIp);
            }
        })
        .context("failed to subscribe to IP events")?;

    // ─── Modo station + credenciales ───

    wifi.set_configuration(&configuration)
        .context("failed to set WiFi station configuration")?;

    info!(target: LOG_TAG, "STA Init complete");

    // ─── Handshake: bloquea hasta Addressed o Aborted ───

    let outcome = handshake::establish(&mut Radio(&mut wifi), &rx);

    // Teardown antes de mirar el resultado: sin callbacks vivos después.
    drop(ip_subscription);
    drop(wifi_subscription);
    drop(rx);

    let outcome = outcome?;

    if outcome == ConnectionOutcome::Success {
        let ip_info = wifi.sta_netif().get_ip_info()?;
        info!(target: LOG_TAG, "STA IP: {}", ip_info.ip);
        info!(target: LOG_TAG, "Gateway: {}", ip_info.subnet.gateway);
    }

    Ok((wifi, outcome))
}
