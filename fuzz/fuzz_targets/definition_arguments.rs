#![no_main]

use libfuzzer_sys::fuzz_target;
use viserio_container::{Argument, ArgumentKey, Definition};

fuzz_target!(|data: &[u8]| {
    let mut definition = Definition::object("service", "Service");

    // Each pair of bytes is one operation and its operand
    for chunk in data.chunks_exact(2) {
        let (op, operand) = (chunk[0], chunk[1]);
        let key = if operand & 0x80 == 0 {
            ArgumentKey::Index(i64::from(operand & 0x0f) - 2)
        } else {
            ArgumentKey::Named(format!("p{}", operand & 0x03))
        };

        match op % 6 {
            0 => {
                definition.add_argument(i64::from(operand));
            }
            1 => {
                definition.set_argument(key, Argument::from(i64::from(operand)));
            }
            2 => {
                let before = definition.get_arguments().len();
                let replaced = definition.replace_argument(key, "x").is_ok();
                assert_eq!(definition.get_arguments().len(), before);
                if replaced {
                    assert!(before > 0);
                }
            }
            3 => {
                definition.remove_argument(key);
            }
            4 => {
                let _ = definition.add_method_call(if operand % 2 == 0 { "" } else { "call" }, vec![], false);
            }
            _ => {
                definition.remove_method_call("call");
            }
        }
    }

    assert!(definition.get_method_calls().iter().all(|call| !call.method.is_empty()));
});
