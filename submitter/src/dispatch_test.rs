use crate::{
    dispatch::{classify_host, DispatchError, Dispatcher, Route, Site},
    test_util::{recording_dispatcher, RecordingRunner},
};

#[test]
pub fn classifies_hosts() {
    assert_eq!(classify_host("cobol00"), Site::Cobol00);
    // SGE wants the exact name
    assert_eq!(classify_host("cobol00.umd.edu"), Site::Elsewhere);
    assert_eq!(classify_host("condor00.umd.edu"), Site::Condor00);
    assert_eq!(classify_host("submit-1.icecube.wisc.edu"), Site::IceCubeSubmit);
    assert_eq!(classify_host("cobalt06.icecube.wisc.edu"), Site::Cobalt);
    assert_eq!(classify_host("laptop"), Site::Elsewhere);
    assert_eq!(classify_host(""), Site::Elsewhere);
}

#[test]
pub fn wraps_commands_per_route() {
    assert_eq!(Route::InPlace.wrap("condor_submit_dag a.dag"), "condor_submit_dag a.dag");
    assert_eq!(
        Route::OneHop { host: "submit" }.wrap("condor_submit_dag a.dag"),
        "ssh submit \"condor_submit_dag a.dag\""
    );
    assert_eq!(
        Route::TwoHops {
            gateway: "pa-pub.umd.edu",
            host: "condor00",
            username: Some(String::from("alice")),
        }
        .wrap("condor_submit_dag a.dag"),
        "ssh alice@pa-pub.umd.edu \"ssh condor00 'condor_submit_dag a.dag ' \""
    );
    assert_eq!(
        Route::TwoHops {
            gateway: "pa-pub.umd.edu",
            host: "cobol00",
            username: None,
        }
        .wrap("source /jobs/cobol00_qsub.sh"),
        "ssh pa-pub.umd.edu \"ssh cobol00 'source /jobs/cobol00_qsub.sh ' \""
    );
}

#[test]
pub fn dry_dispatch_never_runs() {
    let (mut dispatcher, commands) = recording_dispatcher(true);

    dispatcher.run("condor_submit_dag a.dag").unwrap();
    assert!(commands.borrow().is_empty());
}

#[test]
pub fn runs_and_surfaces_failures() {
    let (mut dispatcher, commands) = recording_dispatcher(false);
    dispatcher.run("true").unwrap();
    assert_eq!(*commands.borrow(), vec![String::from("true")]);

    let mut failing = Dispatcher::with_runner(
        false,
        Box::new(RecordingRunner {
            status: 255,
            ..RecordingRunner::default()
        }),
    );
    match failing.run("ssh nowhere true") {
        Err(DispatchError::Failed { command, code }) => {
            assert_eq!(command, "ssh nowhere true");
            assert_eq!(code, Some(255));
        }
        other => panic!("expected a failed relay, got {other:?}"),
    }
}

#[test]
pub fn system_shell_reports_status() {
    let mut dispatcher = Dispatcher::new(false);

    dispatcher.run("exit 0").unwrap();
    assert!(matches!(
        dispatcher.run("exit 4"),
        Err(DispatchError::Failed { code: Some(4), .. })
    ));
}
