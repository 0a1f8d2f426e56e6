//! Two active objects exchanging static signal events under the
//! cooperative scheduler.

use aof_core::{EventRef, Priority, Signal, SignalEvent};
use aof_frame::{Active, ActiveObject, StateMachine};

const SIG_SERVE: Signal = Signal(1);
const SIG_RETURN: Signal = Signal(2);

static SERVE: SignalEvent = SignalEvent::new(SIG_SERVE);
static RETURN: SignalEvent = SignalEvent::new(SIG_RETURN);

struct Ping {
    rallies: u32,
}

impl StateMachine for Ping {
    fn dispatch(&mut self, evt: EventRef) {
        if evt.signal() == SIG_RETURN && self.rallies > 0 {
            self.rallies -= 1;
            println!("ping ({} rallies left)", self.rallies);
            PONG.post(&SERVE, 0);
        }
    }
}

struct Pong;

impl StateMachine for Pong {
    fn dispatch(&mut self, evt: EventRef) {
        if evt.signal() == SIG_SERVE {
            println!("pong");
            PING.post(&RETURN, 0);
        }
    }
}

static PING: ActiveObject<Ping, 4> = ActiveObject::new(Ping { rallies: 3 });
static PONG: ActiveObject<Pong, 4> = ActiveObject::new(Pong);

fn main() {
    PING.start(Priority::new(1).unwrap());
    PONG.start(Priority::new(2).unwrap());

    PING.post(&RETURN, 0);
    aof_coop::run_until_idle();
}
