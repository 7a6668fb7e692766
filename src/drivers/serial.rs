// =============================================================================
// SERIAL SINK - ZERO OVERHEAD
// =============================================================================
//
// Saída de bytes usada pelos macros de log do kernel.
//
// ARQUITETURA:
// O buffer cache é uma biblioteca: quem possui a UART é o kernel que a
// embarca. O kernel instala um `SerialSink` uma única vez no boot e todos os
// macros (`kinfo!`, `ktrace!`, ...) passam a escrever nele.
// - SEM core::fmt - Apenas strings literais e valores imediatos
// - SEM alocação - Hex e decimal formatados em buffer de stack
// - SEM lock próprio - O sink decide como serializar
//
// FUNÇÕES DISPONÍVEIS:
// - install(sink)    : Instala o sink (uma vez)
// - emit(byte)       : Envia um byte
// - emit_str(s)      : Envia string literal
// - emit_hex(v)      : Envia u64 em hexadecimal
// - emit_dec(v)      : Envia usize em decimal
// - emit_nl()        : Envia newline (\r\n)
//
// Sem sink instalado: com a feature `std` os bytes vão para stderr,
// sem ela são descartados.
//
// NOTA IMPORTANTE:
// Este módulo NÃO garante exclusão mútua entre CPUs. Em ambiente SMP,
// os logs podem se intercalar. Isso é aceitável para debugging.
//
// =============================================================================

use spin::Once;

/// Destino dos bytes de log (UART, console, buffer de teste).
pub trait SerialSink: Send + Sync {
    /// Escreve os bytes na ordem recebida.
    fn write_bytes(&self, bytes: &[u8]);
}

static SINK: Once<&'static dyn SerialSink> = Once::new();

/// Instala o sink de log.
///
/// Apenas a primeira chamada tem efeito; retorna `false` se já havia um
/// sink instalado.
pub fn install(sink: &'static dyn SerialSink) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

// =============================================================================
// FUNÇÕES DE ESCRITA - CORE
// =============================================================================

#[inline]
fn write(bytes: &[u8]) {
    if let Some(sink) = SINK.get() {
        sink.write_bytes(bytes);
        return;
    }
    fallback(bytes);
}

#[cfg(any(test, feature = "std"))]
fn fallback(bytes: &[u8]) {
    // eprint! é capturado pelo harness de testes
    std::eprint!("{}", alloc::string::String::from_utf8_lossy(bytes));
}

#[cfg(not(any(test, feature = "std")))]
fn fallback(_bytes: &[u8]) {}

/// Envia um único byte.
#[inline(always)]
pub fn emit(byte: u8) {
    write(&[byte]);
}

/// Envia uma string.
#[inline(always)]
pub fn emit_str(s: &str) {
    write(s.as_bytes());
}

/// Envia newline (\r\n).
#[inline(always)]
pub fn emit_nl() {
    write(b"\r\n");
}

/// Envia um valor u64 em hexadecimal (formato 0x0000000000000000).
#[inline(never)]
pub fn emit_hex(value: u64) {
    let mut buf = [0u8; 18];
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..16 {
        let shift = (15 - i) * 4;
        buf[2 + i] = nibble_to_ascii(((value >> shift) & 0xF) as u8);
    }
    write(&buf);
}

/// Envia um valor usize em formato decimal.
///
/// # Nota
/// Esta função usa um buffer de stack de 20 bytes (máximo para u64).
#[inline(never)]
pub fn emit_dec(mut value: usize) {
    let mut buf: [u8; 20] = [0; 20];
    let mut pos = 20;

    if value == 0 {
        emit(b'0');
        return;
    }

    while value > 0 {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
    }

    write(&buf[pos..]);
}

// =============================================================================
// FUNÇÕES AUXILIARES
// =============================================================================

/// Converte nibble (0-15) para caractere ASCII ('0'-'9', 'A'-'F').
#[inline(always)]
const fn nibble_to_ascii(n: u8) -> u8 {
    if n < 10 {
        b'0' + n
    } else {
        b'A' + (n - 10)
    }
}
