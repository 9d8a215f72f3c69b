// tests/hardware_tests.rs
//
// Require an MCP23S17 on /dev/spidev0.0 with hardware address 0
// (e.g. a PiFace Digital) and its INT output on GPIO 25.

use mcp23s17_spi::{
    iocon, DirectionFilter, GpioInterruptLine, Mcp23s17, Port, PortEventListener, Register,
    Result, SpiConfig,
};
use std::sync::{mpsc, Arc};
use std::time::Duration;

fn open_test_chip() -> Mcp23s17 {
    let chip = Mcp23s17::open(0, &SpiConfig::default())
        .expect("Failed to open /dev/spidev0.0. Is SPI enabled?");
    chip.write(
        Register::IoCon,
        iocon::BANK_OFF
            | iocon::INT_MIRROR_OFF
            | iocon::SEQOP_OFF
            | iocon::DISSLW_OFF
            | iocon::HAEN_ON
            | iocon::ODR_OFF
            | iocon::INTPOL_LOW,
    )
    .expect("Failed to configure IOCON");
    chip
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_output_latch_readback() -> Result<()> {
    let chip = open_test_chip();
    chip.write(Register::IoDirA, 0x00)?;

    for value in [0x00, 0xFF, 0xA5, 0x5A] {
        chip.write(Register::OLatA, value)?;
        assert_eq!(chip.read(Register::OLatA)?, value);
    }
    chip.write(Register::OLatA, 0x00)?;
    Ok(())
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_bit_write_readback() -> Result<()> {
    let chip = open_test_chip();
    chip.write(Register::IoDirA, 0x00)?;
    chip.write(Register::OLatA, 0x00)?;

    for n in 0..8 {
        chip.write_bit(1, n, Register::OLatA)?;
        assert_eq!(chip.read_bit(n, Register::OLatA)?, 1);
    }
    assert_eq!(chip.read(Register::OLatA)?, 0xFF);
    chip.write(Register::OLatA, 0x00)?;
    Ok(())
}

#[test]
#[ignore] // Requires hardware and someone pressing switch 0
fn test_switch_press_interrupt() -> Result<()> {
    let chip = Arc::new(open_test_chip());
    chip.write(Register::IoDirB, 0xFF)?;
    chip.write(Register::GpPuB, 0xFF)?;

    let line = GpioInterruptLine::default();
    chip.clear_interrupts(Port::B)?;
    chip.enable_interrupts(Port::B, &line)?;

    let (tx, rx) = mpsc::channel();
    let mut listener = PortEventListener::new(Port::B, Arc::clone(&chip));
    listener.register(0, DirectionFilter::Falling, move |event| {
        let _ = tx.send(event.pin_num());
    })?;
    listener.activate()?;

    println!("Press switch 0 within 10 seconds...");
    let pressed = rx.recv_timeout(Duration::from_secs(10));

    listener.deactivate()?;
    chip.disable_interrupts(Port::B, &line)?;
    assert_eq!(pressed.expect("No interrupt received"), Some(0));
    Ok(())
}
