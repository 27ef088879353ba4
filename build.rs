/// Build script para proyectos ESP-IDF.
///
/// `embuild::espidf::sysenv::output()` propaga al linker la configuración
/// que generó esp-idf-sys (SDK de C, cross-compiler, bindings).
///
/// En el host (cargo test de la lógica pura) no hay SDK que linkear,
/// así que solo lo invocamos cuando el target es ESP-IDF.
fn main() {
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
