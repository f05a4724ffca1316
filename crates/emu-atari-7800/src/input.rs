//! Input handling for the 7800.
//!
//! Three layers:
//! 1. `Button` — logical controls (joystick lines, fire buttons, console
//!    switches).
//! 2. `InputState` — a snapshot of every control, written to the RIOT
//!    ports and the TIA input latches once per frame.
//! 3. `InputQueue` — timed events for scripted, headless runs.
//!
//! Port wiring, all active low unless noted:
//!
//! | Where    | Bits | Meaning |
//! |----------|------|---------|
//! | SWCHA    | 7..4 | Player 0 right, left, down, up |
//! | SWCHA    | 3..0 | Player 1 right, left, down, up |
//! | SWCHB    | 0, 1, 3 | Reset, select, pause |
//! | SWCHB    | 6, 7 | Left, right difficulty (set = A) |
//! | INPT0/1  | 7    | Player 0 right/left button, active high, two-button mode |
//! | INPT2/3  | 7    | Player 1 right/left button, active high, two-button mode |
//! | INPT4/5  | 7    | Player 0/1 fire, one-button mode |
//!
//! A player is in two-button mode when the program drives its SWCHB
//! select line (bit 2 for player 0, bit 4 for player 1) low as an output.

use std::collections::VecDeque;

use mos_riot_6532::Riot6532;

use crate::memory::{INPT0, INPT1, INPT2, INPT3, INPT4, INPT5, Memory};

/// Logical control on the 7800.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up(usize),
    Down(usize),
    Left(usize),
    Right(usize),
    /// Left (primary) fire button of a Pro-Line joystick.
    LeftFire(usize),
    RightFire(usize),
    Reset,
    Select,
    Pause,
    /// Pressed = A (pro) position.
    LeftDifficulty,
    RightDifficulty,
    LightgunTrigger,
}

/// One joystick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Joystick {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub left_fire: bool,
    pub right_fire: bool,
}

impl Joystick {
    /// Direction nibble for SWCHA, active low, right in bit 3.
    #[must_use]
    fn nibble(self) -> u8 {
        let mut bits = 0x0F;
        if self.right {
            bits &= !0x08;
        }
        if self.left {
            bits &= !0x04;
        }
        if self.down {
            bits &= !0x02;
        }
        if self.up {
            bits &= !0x01;
        }
        bits
    }
}

/// Every control, as sampled at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pub joysticks: [Joystick; 2],
    pub reset: bool,
    pub select: bool,
    pub pause: bool,
    /// Left difficulty in the A position.
    pub left_difficulty_a: bool,
    pub right_difficulty_a: bool,
    pub lightgun_trigger: bool,
    /// Player 0 has a lightgun instead of a joystick.
    pub lightgun: bool,
    /// Swap left and right fire buttons.
    pub swap_buttons: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    /// Nothing pressed, both difficulty switches at B.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            joysticks: [Joystick {
                up: false,
                down: false,
                left: false,
                right: false,
                left_fire: false,
                right_fire: false,
            }; 2],
            reset: false,
            select: false,
            pause: false,
            left_difficulty_a: false,
            right_difficulty_a: false,
            lightgun_trigger: false,
            lightgun: false,
            swap_buttons: false,
        }
    }

    /// Press or release a control.
    pub fn set(&mut self, button: Button, pressed: bool) {
        match button {
            Button::Up(p) => self.joysticks[p & 1].up = pressed,
            Button::Down(p) => self.joysticks[p & 1].down = pressed,
            Button::Left(p) => self.joysticks[p & 1].left = pressed,
            Button::Right(p) => self.joysticks[p & 1].right = pressed,
            Button::LeftFire(p) => self.joysticks[p & 1].left_fire = pressed,
            Button::RightFire(p) => self.joysticks[p & 1].right_fire = pressed,
            Button::Reset => self.reset = pressed,
            Button::Select => self.select = pressed,
            Button::Pause => self.pause = pressed,
            Button::LeftDifficulty => self.left_difficulty_a = pressed,
            Button::RightDifficulty => self.right_difficulty_a = pressed,
            Button::LightgunTrigger => self.lightgun_trigger = pressed,
        }
    }

    /// SWCHA as driven by the controllers.
    #[must_use]
    pub fn swcha(&self) -> u8 {
        let player0 = if self.lightgun {
            // Only the trigger line is wired; it reads high while pulled.
            if self.lightgun_trigger { 0x0F } else { 0x0E }
        } else {
            self.joysticks[0].nibble()
        };
        (player0 << 4) | self.joysticks[1].nibble()
    }

    /// SWCHB as driven by the console switches.
    #[must_use]
    pub fn swchb(&self) -> u8 {
        let mut bits = 0x3F;
        if self.reset {
            bits &= !0x01;
        }
        if self.select {
            bits &= !0x02;
        }
        if self.pause {
            bits &= !0x08;
        }
        if self.left_difficulty_a {
            bits |= 0x40;
        }
        if self.right_difficulty_a {
            bits |= 0x80;
        }
        bits
    }

    fn fire(&self, player: usize) -> (bool, bool) {
        let stick = self.joysticks[player];
        if self.swap_buttons {
            (stick.right_fire, stick.left_fire)
        } else {
            (stick.left_fire, stick.right_fire)
        }
    }

    /// Drive the RIOT ports and the input latches.
    ///
    /// Must run after the program has had a chance to set CTLSWB, since
    /// the button mode depends on it.
    pub fn apply(&self, riot: &mut Riot6532, memory: &mut Memory) {
        riot.external_a = self.swcha();
        riot.external_b = self.swchb();

        let latches = [(INPT1, INPT0, INPT4, 0x04u8), (INPT3, INPT2, INPT5, 0x10u8)];
        for (player, (left_latch, right_latch, single, select_bit)) in
            latches.into_iter().enumerate()
        {
            let (left, right) = self.fire(player);
            let two_button =
                riot.ddr_b() & select_bit != 0 && riot.port_b_output() & select_bit == 0;
            if two_button {
                memory.poke(left_latch, if left { 0x80 } else { 0x00 });
                memory.poke(right_latch, if right { 0x80 } else { 0x00 });
                memory.poke(single, 0x80);
            } else {
                memory.poke(left_latch, 0x00);
                memory.poke(right_latch, 0x00);
                if player == 0 && self.lightgun {
                    // INPT4 belongs to the lightgun sensor.
                    continue;
                }
                memory.poke(single, if left || right { 0x00 } else { 0x80 });
            }
        }
    }
}

/// A timed input event.
#[derive(Debug, Clone)]
pub struct InputEvent {
    /// Frame number at which this event fires.
    pub frame: u64,
    pub button: Button,
    /// True = press, false = release.
    pub pressed: bool,
}

/// Timed input queue for scripted sequences.
///
/// Events are sorted by frame number and processed at the start of each frame.
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a raw input event.
    pub fn push(&mut self, event: InputEvent) {
        let pos = self
            .events
            .iter()
            .position(|e| e.frame > event.frame)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }

    /// Enqueue a press and the matching release.
    pub fn enqueue_button(&mut self, button: Button, at_frame: u64, hold_frames: u64) {
        self.push(InputEvent {
            frame: at_frame,
            button,
            pressed: true,
        });
        self.push(InputEvent {
            frame: at_frame + hold_frames,
            button,
            pressed: false,
        });
    }

    /// Apply every event due at or before `frame`.
    pub fn process(&mut self, frame: u64, state: &mut InputState) {
        while self.events.front().is_some_and(|e| e.frame <= frame) {
            if let Some(event) = self.events.pop_front() {
                state.set(event.button, event.pressed);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joystick_bits_are_active_low() {
        let mut state = InputState::new();
        assert_eq!(state.swcha(), 0xFF);
        state.set(Button::Up(0), true);
        state.set(Button::Right(1), true);
        assert_eq!(state.swcha(), 0b1110_0111);
    }

    #[test]
    fn console_switches() {
        let mut state = InputState::new();
        assert_eq!(state.swchb(), 0x3F);
        state.set(Button::Reset, true);
        state.set(Button::Pause, true);
        state.set(Button::RightDifficulty, true);
        assert_eq!(state.swchb(), 0x80 | 0x36);
    }

    #[test]
    fn one_button_mode_uses_inpt4() {
        let mut state = InputState::new();
        let mut riot = Riot6532::new();
        let mut memory = Memory::new();
        state.apply(&mut riot, &mut memory);
        assert_eq!(memory.read(INPT4), 0x80);

        state.set(Button::RightFire(0), true);
        state.apply(&mut riot, &mut memory);
        assert_eq!(memory.read(INPT4), 0x00);
        assert_eq!(memory.read(INPT0), 0x00);
        assert_eq!(memory.read(INPT5), 0x80);
    }

    #[test]
    fn two_button_mode_uses_paddle_latches() {
        let mut state = InputState::new();
        let mut riot = Riot6532::new();
        let mut memory = Memory::new();
        riot.write(0x0283, 0x14);
        riot.write(0x0282, 0x00);

        state.set(Button::LeftFire(0), true);
        state.set(Button::RightFire(1), true);
        state.apply(&mut riot, &mut memory);
        assert_eq!(memory.read(INPT1), 0x80);
        assert_eq!(memory.read(INPT0), 0x00);
        assert_eq!(memory.read(INPT2), 0x80);
        assert_eq!(memory.read(INPT4), 0x80);
        assert_eq!(memory.read(INPT5), 0x80);

        state.swap_buttons = true;
        state.apply(&mut riot, &mut memory);
        assert_eq!(memory.read(INPT0), 0x80);
        assert_eq!(memory.read(INPT1), 0x00);
    }

    #[test]
    fn lightgun_trigger_on_up_line() {
        let mut state = InputState::new();
        state.lightgun = true;
        assert_eq!(state.swcha() >> 4, 0x0E);
        state.set(Button::LightgunTrigger, true);
        assert_eq!(state.swcha() >> 4, 0x0F);

        let mut riot = Riot6532::new();
        let mut memory = Memory::new();
        memory.poke(INPT4, 0x00);
        state.apply(&mut riot, &mut memory);
        assert_eq!(memory.read(INPT4), 0x00, "sensor latch left alone");
    }

    #[test]
    fn queue_presses_and_releases() {
        let mut queue = InputQueue::new();
        let mut state = InputState::new();
        queue.enqueue_button(Button::Select, 5, 3);
        assert_eq!(queue.len(), 2);

        queue.process(4, &mut state);
        assert!(!state.select);
        queue.process(5, &mut state);
        assert!(state.select);
        queue.process(8, &mut state);
        assert!(!state.select);
        assert!(queue.is_empty());
    }
}
