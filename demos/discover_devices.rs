// Device discovery example
//
// Lists the devices a driver can see, their identity strings and basic
// detector information. Runs against the built-in simulator.

use std::sync::Arc;

use radiospec_rs::{DeviceRegistry, GeneralInstrument, SimulatedDevice, SimulatedDriver};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Spectroradiometer Discovery Example");
    println!("===================================\n");

    let driver = Arc::new(SimulatedDriver::with_devices(vec![
        SimulatedDevice::new("B24-0117", "S24-0117", "RS-1000-0117"),
        SimulatedDevice::new("B24-0342", "S24-0342", "RS-1000-0342"),
    ]));
    let registry = DeviceRegistry::<GeneralInstrument>::new(driver);

    // 1. Host serial ports, candidates for COM-port selectors
    println!("1. Serial ports on this host:");
    match DeviceRegistry::<GeneralInstrument>::serial_ports() {
        Ok(ports) if ports.is_empty() => println!("   none"),
        Ok(ports) => ports.iter().for_each(|port| println!("   {}", port)),
        Err(err) => println!("   could not enumerate: {}", err),
    }

    // 2. Devices reported by the driver
    println!("\n2. Devices reported by the {} driver:", registry.family_name());
    let devices = registry.enumerate()?;
    if devices.is_empty() {
        println!("No devices found. Please connect a device and try again.");
        return Ok(());
    }
    for device in &devices {
        println!(
            "   [{}] board {} / spectrometer {} / device {}",
            device.index, device.board_serial, device.spectrometer_serial, device.device_serial
        );
    }

    // 3. Open each one and read its detector information
    println!("\n3. Detector information:");
    for device in &devices {
        let mut session = registry.open_serial(&device.device_serial)?;
        let (begin, end) = session.wavelength_range()?;
        println!(
            "   {}: {} pixels, {:.0}-{:.0} nm, {}-bit ADC, {:.1} °C, integration {}",
            device.device_serial,
            session.pixel_count()?,
            begin,
            end,
            session.adc_resolution()?,
            session.detector_temperature()?,
            session.integration_time_limits()?
        );
    }

    Ok(())
}
