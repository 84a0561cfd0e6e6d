use super::{BufferError, BufferView, BufferViewMut};

#[test]
fn test_view_selects_sub_range() {
    let bytes = b"calimero enclave";

    let view = BufferView::new(bytes, 9, 7).unwrap();

    assert_eq!(view.as_slice(), b"enclave");
    assert_eq!(view.len(), 7);
}

#[test]
fn test_view_empty_range_at_end() {
    let bytes = [1_u8, 2, 3];

    let view = BufferView::new(&bytes, 3, 0).unwrap();

    assert!(view.is_empty());
}

#[test]
fn test_view_out_of_bounds() {
    let bytes = [0_u8; 8];

    let err = BufferView::new(&bytes, 4, 5).unwrap_err();

    assert_eq!(
        err,
        BufferError::OutOfBounds {
            offset: 4,
            len: 5,
            capacity: 8
        }
    );
}

#[test]
fn test_view_offset_overflow() {
    let bytes = [0_u8; 8];

    let result = BufferView::new(&bytes, usize::MAX, 2);

    assert!(matches!(result, Err(BufferError::OutOfBounds { .. })));
}

#[test]
fn test_view_mut_writes_inside_range_only() {
    let mut bytes = [0_u8; 8];

    {
        let mut view = BufferViewMut::new(&mut bytes, 2, 4).unwrap();
        let written = view.write(&[9, 9, 9]).unwrap();
        assert_eq!(written, 3);
    }

    assert_eq!(bytes, [0, 0, 9, 9, 9, 0, 0, 0]);
}

#[test]
fn test_view_mut_too_small_writes_nothing() {
    let mut bytes = [0_u8; 8];

    {
        let mut view = BufferViewMut::new(&mut bytes, 4, 2).unwrap();
        let err = view.write(&[7, 7, 7]).unwrap_err();
        assert_eq!(
            err,
            BufferError::TooSmall {
                required: 3,
                available: 2
            }
        );
    }

    assert_eq!(bytes, [0; 8]);
}
