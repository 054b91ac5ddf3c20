use std::rc::Rc;
use std::time::Duration;

use stickflow::devices::{gamepad, VirtualGamepad};
use stickflow::{
    composite, shortcut, Context, InputEvent, InputSource, InputSourceExt, LogObserver,
};

fn main() -> stickflow::Result<()> {
    env_logger::init();

    let context = Context::new()?;
    let pad = VirtualGamepad::attach(&context, 1, "Demo Virtual Gamepad")?;

    let _jump = gamepad::BUTTON_SOUTH
        .pressed()
        .subscribe_fn(&context, |event: &InputEvent| println!("(Virtual) jump {event}"))?;
    let _charge = gamepad::BUTTON_WEST
        .held(Duration::from_millis(30))
        .subscribe_fn(&context, |event: &InputEvent| println!("(Virtual) charged {event}"))?;
    let _menu = shortcut([gamepad::SELECT, gamepad::START])
        .pressed()
        .subscribe_fn(&context, |event: &InputEvent| println!("(Virtual) menu {event}"))?;
    let _strafe = composite(gamepad::DPAD_LEFT, gamepad::DPAD_RIGHT)
        .subscribe(&context, Rc::new(LogObserver::new("strafe")))?;
    let _throttle = gamepad::RIGHT_TRIGGER
        .low_pass_filter()
        .subscribe_fn(&context, |value: &f32| println!("(Virtual) throttle = {value:.3}"))?;

    // Inject some sample input, one frame at a time
    pad.press_button(gamepad::BUTTON_SOUTH);
    pad.press_button(gamepad::BUTTON_WEST);
    pad.set_axis(gamepad::RIGHT_TRIGGER, 0.75);
    context.update();

    pad.press_button(gamepad::SELECT);
    pad.press_button(gamepad::DPAD_RIGHT);
    pad.set_axis(gamepad::RIGHT_TRIGGER, 1.0);
    context.update();

    pad.press_button(gamepad::START);
    pad.release_button(gamepad::BUTTON_SOUTH);
    std::thread::sleep(Duration::from_millis(40));
    context.update();

    Ok(())
}
