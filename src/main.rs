// ─── wifi-tcp-sentinel: firmware ───
//
// Secuencia de arranque, estrictamente en orden:
// 1. NVS (storage)
// 2. WiFi station hasta obtener IP, o fallo tras 10 reintentos
// 3. Una conexión TCP al servidor, leyendo hasta la línea "HELLO\n"
//
// Módulos: wifi (binario) + config, handshake, sentinel, tcp (lib)

#[cfg(target_os = "espidf")]
mod wifi;

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use log::{error, info};

    use wifi_tcp_sentinel::{
        config::{self, Credentials},
        handshake::ConnectionOutcome,
        tcp, LOG_TAG,
    };

    use crate::wifi;

    // ─── Punto de entrada ───
    //
    // Patrón main() → run(): run() retorna Result y usa ? para los errores
    // fatales (driver, event loop, NVS). Si run() falla, logueamos y
    // reiniciamos el chip de inmediato.
    // WiFi sin conexión o servidor inaccesible NO son fatales: run() loguea
    // y retorna Ok, y el programa termina.

    pub fn main() {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        info!(target: LOG_TAG, "wifi-tcp-sentinel");

        if let Err(e) = run() {
            error!(target: LOG_TAG, "Fatal error: {:?}", e);
            error!(target: LOG_TAG, "Restarting...");
            unsafe {
                esp_idf_svc::sys::esp_restart();
            }
        }
    }

    fn run() -> anyhow::Result<()> {
        // ─── Inicialización del sistema ───

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;

        // take() inicializa la partición NVS; si está llena o es de una
        // versión anterior, la borra y reintenta.
        let nvs_partition = EspDefaultNvsPartition::take()?;

        // ─── Fase 1: WiFi ───

        let credentials = Credentials::from_build_env();

        // _wifi debe vivir hasta el final: si se dropea, se pierde la conexión.
        let (_wifi, outcome) =
            wifi::connect(&credentials, peripherals.modem, sysloop, nvs_partition)?;

        // drop() explícito: ZeroizeOnDrop borra la passphrase de memoria.
        drop(credentials);

        if outcome == ConnectionOutcome::Failure {
            error!(target: LOG_TAG, "Failed to associate to access point. Dying...");
            return Ok(());
        }

        // ─── Fase 2: TCP ───

        if let Err(e) = tcp::await_sentinel(
            config::SERVER_ADDR,
            config::SERVER_PORT,
            config::SENTINEL_MATCH,
        ) {
            error!(target: LOG_TAG, "Failed to connect to remote server. Dying... ({:#})", e);
            return Ok(());
        }

        info!(target: LOG_TAG, "Sentinel received, done");
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    firmware::main();
}

// En el host solo se compila la lib (y sus tests); el firmware no tiene
// sentido fuera del chip.
#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("wifi-tcp-sentinel is ESP-IDF firmware; build it for an espidf target");
    std::process::exit(1);
}
