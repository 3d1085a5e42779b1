use mx2482::{MainSide, SampleBuffer, SubgroupPair, SILENCE_DB};

mod utils;
use utils::{console, feed, read, sine};

#[test]
fn channel_reaches_its_subgroup_pair_only() {
    let (mut ports, m, mut engine) = console(2, 8);
    let ch1 = m.channel(1).unwrap();
    ch1.set_in_subgroup_pair(SubgroupPair::Pair12, true);
    ch1.set_panorama_raw(-100);
    m.channel(2).unwrap().set_muted(true);
    m.channel(2).unwrap().set_in_subgroup_pair(SubgroupPair::Pair12, true);
    feed(&mut ports, "ch1_in", &[0.5; 8]);
    feed(&mut ports, "ch2_in", &[0.9; 8]);

    engine.process(&mut ports);

    assert_eq!(read(&ports, "subgroup1_out"), read(&ports, "ch1_out"));
    assert_eq!(read(&ports, "subgroup2_out"), vec![0.0; 8]);
    for n in 3..=8 {
        assert_eq!(read(&ports, &format!("subgroup{n}_out")), vec![0.0; 8]);
    }
    // The muted channel still meters and feeds its direct out
    assert_eq!(read(&ports, "ch2_out"), vec![0.9; 8]);
    assert!(m.channel(2).unwrap().peak_db() > SILENCE_DB);
}

#[test]
fn pan_splits_between_pair() {
    let (mut ports, m, mut engine) = console(1, 4);
    let channel = m.channel(1).unwrap();
    channel.set_in_subgroup_pair(SubgroupPair::Pair56, true);
    channel.set_panorama_raw(50);
    feed(&mut ports, "ch1_in", &[1.0; 4]);

    engine.process(&mut ports);

    let left = read(&ports, "subgroup5_out");
    let right = read(&ports, "subgroup6_out");
    assert_eq!(left, vec![0.25; 4]);
    assert_eq!(right, vec![0.75; 4]);
}

#[test]
fn channel_can_feed_several_pairs_and_main() {
    let (mut ports, m, mut engine) = console(1, 4);
    let channel = m.channel(1).unwrap();
    for pair in SubgroupPair::ALL {
        channel.set_in_subgroup_pair(pair, true);
    }
    channel.set_on_main(true);
    channel.set_panorama_raw(-100);
    for subgroup in m.subgroups() {
        subgroup.set_on_main(false);
    }
    feed(&mut ports, "ch1_in", &[0.25; 4]);

    engine.process(&mut ports);

    for n in [1, 3, 5, 7] {
        assert_eq!(read(&ports, &format!("subgroup{n}_out")), vec![0.25; 4]);
    }
    assert_eq!(read(&ports, "main_out_1"), vec![0.25; 4]);
    assert_eq!(read(&ports, "main_out_2"), vec![0.0; 4]);
}

#[test]
fn subgroup_solo_overrides_other_subgroups() {
    let (mut ports, m, mut engine) = console(2, 4);
    let ch1 = m.channel(1).unwrap();
    let ch2 = m.channel(2).unwrap();
    ch1.set_in_subgroup_pair(SubgroupPair::Pair12, true);
    ch1.set_panorama_raw(-100);
    ch2.set_in_subgroup_pair(SubgroupPair::Pair34, true);
    ch2.set_panorama_raw(100);
    m.subgroup(4).unwrap().set_soloed(true);
    feed(&mut ports, "ch1_in", &[0.5; 4]);
    feed(&mut ports, "ch2_in", &[0.25; 4]);

    engine.process(&mut ports);

    assert_eq!(read(&ports, "main_out_1"), vec![0.0; 4]);
    assert_eq!(read(&ports, "main_out_2"), vec![0.25; 4]);
    // Subgroup 1 isn't on main, but still metered
    assert!(m.subgroup(1).unwrap().peak_db() > -7.0);
}

#[test]
fn solo_and_mute_at_channel_level() {
    let (mut ports, m, mut engine) = console(3, 4);
    for channel in m.channels() {
        channel.set_on_main(true);
        channel.set_panorama_raw(-100);
    }
    m.channel(1).unwrap().set_soloed(true);
    m.channel(2).unwrap().set_soloed(true);
    m.channel(2).unwrap().set_muted(true);
    feed(&mut ports, "ch1_in", &[0.125; 4]);
    feed(&mut ports, "ch2_in", &[0.25; 4]);
    feed(&mut ports, "ch3_in", &[0.5; 4]);

    engine.process(&mut ports);

    // Only the soloed, unmuted channel 1 is heard
    assert_eq!(read(&ports, "main_out_1"), vec![0.125; 4]);
}

#[test]
fn faders_scale_buses() {
    let (mut ports, m, mut engine) = console(1, 4);
    let channel = m.channel(1).unwrap();
    channel.set_in_subgroup_pair(SubgroupPair::Pair12, true);
    channel.set_panorama_raw(-100);
    m.subgroup(1).unwrap().set_fader_gain(-96);
    feed(&mut ports, "ch1_in", &[1.0; 4]);

    engine.process(&mut ports);

    assert_eq!(read(&ports, "subgroup1_out"), vec![0.0; 4]);
    assert_eq!(m.subgroup(1).unwrap().peak_db(), SILENCE_DB);
    assert_eq!(m.main(MainSide::Left).peak_db(), SILENCE_DB);
}

#[test]
fn fader_changes_are_ramped() {
    let (mut ports, m, mut engine) = console(1, 4);
    let channel = m.channel(1).unwrap();
    channel.set_fader_gain(-96);
    feed(&mut ports, "ch1_in", &[1.0; 4]);

    engine.process(&mut ports);
    assert_eq!(read(&ports, "ch1_out"), vec![0.0; 4]);

    channel.set_fader_gain(0);
    engine.process(&mut ports);
    assert_eq!(read(&ports, "ch1_out"), vec![0.25, 0.5, 0.75, 1.0]);

    engine.process(&mut ports);
    assert_eq!(read(&ports, "ch1_out"), vec![1.0; 4]);
}

#[test]
fn equalizer_only_when_enabled() {
    let (mut ports, m, mut engine) = console(1, 2048);
    let channel = m.channel(1).unwrap();
    channel.set_mid_frequency(1000);
    channel.set_mid_amount(-15);
    let signal = sine(1000.0, 2048);
    feed(&mut ports, "ch1_in", &signal);

    engine.process(&mut ports);
    assert_eq!(read(&ports, "ch1_out"), signal);

    channel.set_equalizer_enabled(true);
    engine.process(&mut ports);
    let filtered = read(&ports, "ch1_out");
    assert!(filtered[1024..].peak() < 0.15);
}

#[test]
fn aux_loop_is_an_insert() {
    let (mut ports, m, mut engine) = console(1, 4);
    let channel = m.channel(1).unwrap();
    channel.set_on_main(true);
    channel.set_panorama_raw(-100);
    feed(&mut ports, "ch1_in", &[0.5; 4]);
    feed(&mut ports, "ch1_aux_ret", &[0.125; 4]);

    engine.process(&mut ports);
    assert_eq!(read(&ports, "ch1_aux_send"), vec![0.0; 4]);
    assert_eq!(read(&ports, "main_out_1"), vec![0.5; 4]);

    channel.set_aux_loop_enabled(true);
    engine.process(&mut ports);
    assert_eq!(read(&ports, "ch1_aux_send"), vec![0.5; 4]);
    assert_eq!(read(&ports, "main_out_1"), vec![0.125; 4]);
}

#[test]
fn input_gain_is_clamped() {
    let (_ports, m, _engine) = console(1, 4);
    let channel = m.channel(1).unwrap();

    channel.set_input_gain(100);
    channel.set_mid_frequency(10);
    channel.set_panorama_raw(-1000);

    assert_eq!(channel.input_gain(), 24);
    assert_eq!(channel.mid_frequency(), 200);
    assert_eq!(channel.panorama(), 0.0);
}
