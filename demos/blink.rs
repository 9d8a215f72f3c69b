use mcp23s17_spi::{iocon, DigitalOutput, Mcp23s17, Port, Register, Result, SpiConfig};
use std::{thread, time::Duration};

// Output 0 on port A
const BLINK_PIN_NUM: u8 = 0;
const HARDWARE_ADDR: u8 = 0;

fn main() -> Result<()> {
    env_logger::init();
    println!("Opening {}...", SpiConfig::default().device_path().display());
    let chip = Mcp23s17::open(HARDWARE_ADDR, &SpiConfig::default())?;
    println!("Chip opened ({}).", chip.hardware_addr());

    chip.write(
        Register::IoCon,
        iocon::BANK_OFF
            | iocon::INT_MIRROR_OFF
            | iocon::SEQOP_OFF
            | iocon::DISSLW_OFF
            | iocon::HAEN_ON
            | iocon::ODR_OFF
            | iocon::INTPOL_LOW,
    )?;
    chip.write(Register::IoDirA, 0x00)?; // port A: outputs
    chip.write(Register::GpioA, 0x00)?;

    let led = DigitalOutput::pin(&chip, Port::A, BLINK_PIN_NUM)?;
    println!("Blinking pin {} (Press Ctrl+C to stop)", BLINK_PIN_NUM);
    loop {
        led.toggle()?;
        thread::sleep(Duration::from_millis(250));
    }
}
