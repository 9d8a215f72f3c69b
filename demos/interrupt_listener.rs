use mcp23s17_spi::{
    iocon, DigitalInput, DirectionFilter, GpioInterruptLine, Mcp23s17, Port, PortEventListener,
    Register, Result, SpiConfig,
};
use std::sync::Arc;
use std::{thread, time::Duration};

const HARDWARE_ADDR: u8 = 0;
const RUN_TIME: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    env_logger::init();
    let chip = Arc::new(Mcp23s17::open(HARDWARE_ADDR, &SpiConfig::default())?);

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
    chip.write(Register::IoDirB, 0xFF)?; // port B: inputs
    chip.write(Register::GpPuB, 0xFF)?; // with pull-ups, switches pull to ground

    let line = GpioInterruptLine::default();
    chip.clear_interrupts(Port::B)?;
    chip.enable_interrupts(Port::B, &line)?;

    let mut listener = PortEventListener::new(Port::B, Arc::clone(&chip));
    for pin in 0..4 {
        listener.register(pin, DirectionFilter::Falling, move |event| {
            let inputs = DigitalInput::port(&event.chip, Port::B);
            println!(
                "Switch {} pressed (inputs now {:08b})",
                pin,
                inputs.value().unwrap_or_default()
            );
        })?;
    }
    listener.register(0, DirectionFilter::Rising, |_| println!("Switch 0 released"))?;

    listener.activate()?;
    println!("Press the switches, stopping in {:?}", RUN_TIME);
    thread::sleep(RUN_TIME);

    listener.deactivate()?;
    chip.disable_interrupts(Port::B, &line)?;
    Ok(())
}
